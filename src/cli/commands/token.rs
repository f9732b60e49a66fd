use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::config;
use crate::session::issue_token;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "Auth identity id (random when omitted)")]
    pub user_id: Option<Uuid>,

    #[arg(long, help = "Email carried in the token")]
    pub email: String,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let session_config = &config::config().session;
    let user_id = args.user_id.unwrap_or_else(Uuid::new_v4);
    let token = issue_token(session_config, user_id, &args.email)?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "user_id": user_id, "email": args.email, "token": token })
        ),
        OutputFormat::Text => {
            println!("user_id: {}", user_id);
            println!("token:   {}", token);
            println!("sign in: /auth/callback?token={}", token);
        }
    }
    Ok(())
}
