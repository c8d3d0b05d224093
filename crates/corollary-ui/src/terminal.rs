//! Terminal detection.

use std::env;

/// Returns `true` if stdout is connected to a terminal (TTY).
pub fn is_tty() -> bool {
    crossterm::tty::IsTty::is_tty(&std::io::stdout())
}

/// Determines if ANSI color codes should be used on stdout.
///
/// `NO_COLOR` (<https://no-color.org/>), `CLICOLOR=0` and `TERM=dumb` turn
/// color off; `CLICOLOR_FORCE` turns it on without a TTY.
pub fn supports_color() -> bool {
    color_enabled(|name| env::var(name).ok(), is_tty())
}

fn color_enabled(var: impl Fn(&str) -> Option<String>, tty: bool) -> bool {
    let disabled = var("NO_COLOR").is_some()
        || var("CLICOLOR").as_deref() == Some("0")
        || var("TERM").as_deref() == Some("dumb");
    !disabled && (tty || var("CLICOLOR_FORCE").is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(vars: &[(&str, &str)], tty: bool) -> bool {
        color_enabled(
            |name| {
                vars.iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, v)| v.to_string())
            },
            tty,
        )
    }

    #[test]
    fn tty_decides_by_default() {
        assert!(enabled(&[], true));
        assert!(!enabled(&[], false));
    }

    #[test]
    fn opt_outs_win_over_force() {
        assert!(!enabled(&[("NO_COLOR", "")], true));
        assert!(!enabled(&[("CLICOLOR", "0"), ("CLICOLOR_FORCE", "1")], true));
        assert!(!enabled(&[("TERM", "dumb")], true));
        assert!(enabled(&[("CLICOLOR", "1")], true));
    }

    #[test]
    fn force_without_tty() {
        assert!(enabled(&[("CLICOLOR_FORCE", "1")], false));
    }
}
