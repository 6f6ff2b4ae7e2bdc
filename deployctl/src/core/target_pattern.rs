//! Parser for positional `project/app` targets.

use std::sync::LazyLock;

use regex::Regex;

static APP_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<project>[-0-9A-Za-z_]+)/(?P<app>[-0-9A-Za-z_]+)$").unwrap()
});

static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-0-9A-Za-z_]+$").unwrap());

/// Shape of a positional target argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArg<'a> {
    /// `project/app`, both segments valid.
    ProjectAndApp { project: &'a str, app: &'a str },
    /// A single valid segment.
    ProjectOnly(&'a str),
    /// Anything else (`a/b/c`, disallowed characters, empty).
    NoMatch,
}

/// Classify a positional argument.
pub fn parse_target(arg: &str) -> TargetArg<'_> {
    if let Some(caps) = APP_TARGET_RE.captures(arg) {
        let (Some(project), Some(app)) = (caps.name("project"), caps.name("app")) else {
            return TargetArg::NoMatch;
        };
        return TargetArg::ProjectAndApp {
            project: project.as_str(),
            app: app.as_str(),
        };
    }
    if is_valid_segment(arg) {
        return TargetArg::ProjectOnly(arg);
    }
    TargetArg::NoMatch
}

/// True if `name` is a valid project or app name segment.
pub fn is_valid_segment(name: &str) -> bool {
    SEGMENT_RE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_and_app_match() {
        assert_eq!(
            parse_target("shop/web-1_a"),
            TargetArg::ProjectAndApp {
                project: "shop",
                app: "web-1_a"
            }
        );
    }

    #[test]
    fn bare_segment_is_project_only() {
        assert_eq!(parse_target("shop"), TargetArg::ProjectOnly("shop"));
    }

    #[test]
    fn extra_segments_do_not_match() {
        assert_eq!(parse_target("shop/web/extra"), TargetArg::NoMatch);
    }

    #[test]
    fn disallowed_characters_do_not_match() {
        assert_eq!(parse_target("shop/w.b"), TargetArg::NoMatch);
        assert_eq!(parse_target("sh op"), TargetArg::NoMatch);
        assert_eq!(parse_target("/web"), TargetArg::NoMatch);
        assert_eq!(parse_target(""), TargetArg::NoMatch);
    }
}
