/// Caller-supplied knobs for a single decision call. Only `include_reasons`
/// is consulted by the core decision engine itself (it gates
/// [`DecisionReasons`] accumulation below). `disable_decision_event`,
/// `enabled_flags_only`, `ignore_user_profile_service`, and
/// `exclude_variables` are accepted and threaded through for forward
/// compatibility with the (out-of-scope) event pipeline, the decide-all
/// convenience surface, and the user profile service -- the core decision
/// engine itself does not act on them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub disable_decision_event: bool,
    pub enabled_flags_only: bool,
    pub ignore_user_profile_service: bool,
    pub include_reasons: bool,
    pub exclude_variables: bool,
}

/// One accumulated diagnostic. `Error` reasons survive even when the caller
/// didn't ask for reasons (they're the only caller-visible signal that an
/// evaluation was inconclusive); `Info` reasons are dropped unless
/// `Options::include_reasons` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reason {
    Info(String),
    Error(String),
}

/// An ordered, append-only log of decision reasons, built up as sub-deciders
/// run and flattened to strings for the caller via [`DecisionReasons::to_report`].
///
/// Accumulation is gated by `Options::include_reasons` because formatting
/// and pushing strings on every evaluation is wasted work on the hot path
/// when nobody reads them.
#[derive(Debug, Clone, Default)]
pub struct DecisionReasons {
    entries: Vec<Reason>,
    include_reasons: bool,
}

impl DecisionReasons {
    pub fn new(options: &Options) -> Self {
        Self {
            entries: Vec::new(),
            include_reasons: options.include_reasons,
        }
    }

    pub fn append_info(&mut self, message: impl Into<String>) {
        if self.include_reasons {
            self.entries.push(Reason::Info(message.into()));
        }
    }

    pub fn append_error(&mut self, message: impl Into<String>) {
        self.entries.push(Reason::Error(message.into()));
    }

    /// Concatenates `other`'s entries after this one's, in call order, as
    /// required for composing reasons across sub-deciders regardless of
    /// which one short-circuited the decision.
    pub fn merge(&mut self, mut other: DecisionReasons) {
        self.entries.append(&mut other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_report(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|r| match r {
                Reason::Info(s) | Reason::Error(s) => s.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_reasons_are_dropped_without_include_reasons() {
        let mut reasons = DecisionReasons::new(&Options::default());
        reasons.append_info("inconclusive: missing attribute");
        assert!(reasons.to_report().is_empty());
    }

    #[test]
    fn error_reasons_always_survive() {
        let mut reasons = DecisionReasons::new(&Options::default());
        reasons.append_error(r#"invalid Condition matcher "invalid""#);
        assert_eq!(reasons.to_report(), vec![r#"invalid Condition matcher "invalid""#]);
    }

    #[test]
    fn info_reasons_survive_with_include_reasons() {
        let options = Options {
            include_reasons: true,
            ..Default::default()
        };
        let mut reasons = DecisionReasons::new(&options);
        reasons.append_info("a");
        reasons.append_info("b");
        assert_eq!(reasons.to_report(), vec!["a", "b"]);
    }

    #[test]
    fn merge_concatenates_in_call_order() {
        let options = Options {
            include_reasons: true,
            ..Default::default()
        };
        let mut first = DecisionReasons::new(&options);
        first.append_info("from whitelist");
        let mut second = DecisionReasons::new(&options);
        second.append_info("from targeting");
        first.merge(second);
        assert_eq!(first.to_report(), vec!["from whitelist", "from targeting"]);
    }
}
