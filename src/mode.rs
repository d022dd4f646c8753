//! Delivery mode selection from the positional command-line arguments.

/// How the demo producer hands records to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryMode {
    /// Fire-and-forget sends, acknowledged through a delivery callback.
    Async,
    /// Every send blocks until the broker acknowledges it.
    Sync,
}

impl DeliveryMode {
    /// Derives the mode from positional arguments.
    ///
    /// Only the first token matters: it selects [`DeliveryMode::Sync`] when,
    /// once trimmed, it equals `sync` ignoring case. Anything else, including
    /// no token at all, selects [`DeliveryMode::Async`].
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        if is_async(args) {
            DeliveryMode::Async
        } else {
            DeliveryMode::Sync
        }
    }

    pub fn is_async(self) -> bool {
        self == DeliveryMode::Async
    }
}

pub fn is_async<S: AsRef<str>>(args: &[S]) -> bool {
    args.first()
        .map_or(true, |mode| !mode.as_ref().trim().eq_ignore_ascii_case("sync"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_is_async() {
        let args: [&str; 0] = [];
        assert!(is_async(&args));
        assert_eq!(DeliveryMode::from_args(&args), DeliveryMode::Async);
    }

    #[test]
    fn sync_selects_sync_mode() {
        for arg in ["sync", "Sync", "SYNC", " sync ", "\tsYnC\n", "SYNC "] {
            assert_eq!(DeliveryMode::from_args(&[arg]), DeliveryMode::Sync, "{arg:?}");
        }
    }

    #[test]
    fn anything_else_is_async() {
        for arg in ["async", "foo", "", "  ", "syncs", "s ync", "--sync"] {
            assert_eq!(DeliveryMode::from_args(&[arg]), DeliveryMode::Async, "{arg:?}");
        }
    }

    #[test]
    fn only_first_argument_counts() {
        assert_eq!(DeliveryMode::from_args(&["sync", "async"]), DeliveryMode::Sync);
        assert_eq!(DeliveryMode::from_args(&["async", "sync"]), DeliveryMode::Async);
    }

    #[test]
    fn works_with_owned_strings() {
        let args = vec!["sync".to_string()];
        assert!(!is_async(args.as_slice()));
    }

    #[test]
    fn interpretation_is_stable() {
        let args = [" Sync"];
        assert_eq!(DeliveryMode::from_args(&args), DeliveryMode::from_args(&args));
    }

    #[test]
    fn displays_lowercase() {
        assert_eq!(DeliveryMode::Async.to_string(), "async");
        assert_eq!(DeliveryMode::Sync.as_ref(), "sync");
        assert!(DeliveryMode::Async.is_async());
        assert!(!DeliveryMode::Sync.is_async());
    }
}
