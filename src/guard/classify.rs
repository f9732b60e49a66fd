/// Protected area a route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Dashboard,
    Profile,
    Users,
    Files,
    Schools,
    Audit,
}

impl Area {
    /// Areas restricted to ADMIN and SUPER_ADMIN.
    pub fn admin_only(self) -> bool {
        matches!(self, Area::Users | Area::Audit)
    }
}

/// Pages answer failures with redirects, APIs with JSON status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Page,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Static assets; never evaluated.
    Excluded,
    /// Root and auth callbacks.
    Public,
    /// Sign-in and friends; signed-in visitors are bounced to the dashboard.
    AuthPage,
    Protected { area: Area, surface: Surface },
    /// Anything not named by a rule.
    Unguarded,
}

const STATIC_PREFIXES: &[&str] = &["/_next/static", "/_next/image", "/static"];

const STATIC_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp", "ico"];

const AUTH_PAGES: &[&str] = &[
    "/sign-in",
    "/sign-up",
    "/forgot-password",
    "/reset-password",
    "/verify-email",
];

const PROTECTED: &[(&str, Area, Surface)] = &[
    ("/dashboard", Area::Dashboard, Surface::Page),
    ("/profile", Area::Profile, Surface::Page),
    ("/users", Area::Users, Surface::Page),
    ("/api/profile", Area::Profile, Surface::Api),
    ("/api/files", Area::Files, Surface::Api),
    ("/api/users", Area::Users, Surface::Api),
    ("/api/schools", Area::Schools, Surface::Api),
    ("/api/audit", Area::Audit, Surface::Api),
];

/// `prefix` matches `path` on a segment boundary: `/users` matches `/users`
/// and `/users/1` but not `/users-old`.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

pub fn is_static_asset(path: &str) -> bool {
    if path == "/favicon.ico" || STATIC_PREFIXES.iter().any(|p| matches_prefix(path, p)) {
        return true;
    }

    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            STATIC_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Classify a request path. Rules are checked in precedence order; among
/// protected prefixes the longest match wins.
pub fn classify(path: &str) -> RouteClass {
    if is_static_asset(path) {
        return RouteClass::Excluded;
    }

    if path == "/" || matches_prefix(path, "/auth/") {
        return RouteClass::Public;
    }

    if AUTH_PAGES.iter().any(|page| matches_prefix(path, page)) {
        return RouteClass::AuthPage;
    }

    PROTECTED
        .iter()
        .filter(|(prefix, _, _)| matches_prefix(path, prefix))
        .max_by_key(|(prefix, _, _)| prefix.len())
        .map(|&(_, area, surface)| RouteClass::Protected { area, surface })
        .unwrap_or(RouteClass::Unguarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protected(area: Area, surface: Surface) -> RouteClass {
        RouteClass::Protected { area, surface }
    }

    #[test]
    fn static_assets_are_excluded() {
        for path in [
            "/_next/static/chunks/main.js",
            "/_next/image",
            "/static/app.css",
            "/favicon.ico",
            "/logo.svg",
            "/dashboard/banner.PNG",
            "/img/photo.jpeg",
        ] {
            assert_eq!(classify(path), RouteClass::Excluded, "{}", path);
        }
        assert!(!is_static_asset("/api/files"));
        assert!(!is_static_asset("/.png"));
    }

    #[test]
    fn root_and_callbacks_are_public() {
        assert_eq!(classify("/"), RouteClass::Public);
        assert_eq!(classify("/auth/callback"), RouteClass::Public);
        assert_eq!(classify("/auth/sign-out"), RouteClass::Public);
        assert_eq!(classify("/authx"), RouteClass::Unguarded);
    }

    #[test]
    fn auth_pages() {
        for path in AUTH_PAGES {
            assert_eq!(classify(path), RouteClass::AuthPage);
        }
        assert_eq!(classify("/sign-in-help"), RouteClass::Unguarded);
    }

    #[test]
    fn protected_pages_and_apis() {
        assert_eq!(classify("/dashboard"), protected(Area::Dashboard, Surface::Page));
        assert_eq!(classify("/profile/settings"), protected(Area::Profile, Surface::Page));
        assert_eq!(classify("/users"), protected(Area::Users, Surface::Page));
        assert_eq!(classify("/api/users/42"), protected(Area::Users, Surface::Api));
        assert_eq!(classify("/api/files/evidence/1"), protected(Area::Files, Surface::Api));
        assert_eq!(classify("/api/profile/password"), protected(Area::Profile, Surface::Api));
        assert_eq!(classify("/api/schools"), protected(Area::Schools, Surface::Api));
        assert_eq!(classify("/api/audit"), protected(Area::Audit, Surface::Api));
    }

    #[test]
    fn prefixes_respect_segment_boundaries() {
        assert_eq!(classify("/users-old"), RouteClass::Unguarded);
        assert_eq!(classify("/dashboards"), RouteClass::Unguarded);
        assert_eq!(classify("/api/usersx"), RouteClass::Unguarded);
    }

    #[test]
    fn everything_else_is_unguarded() {
        assert_eq!(classify("/health"), RouteClass::Unguarded);
        assert_eq!(classify("/api/auth/session"), RouteClass::Unguarded);
        assert_eq!(classify("/about"), RouteClass::Unguarded);
    }

    #[test]
    fn admin_only_areas() {
        assert!(Area::Users.admin_only());
        assert!(Area::Audit.admin_only());
        assert!(!Area::Dashboard.admin_only());
        assert!(!Area::Files.admin_only());
    }
}
