//! # Scheduler state machine.
//!
//! State changes flow through one explicit [`transition`] function that
//! returns the next state plus the [`Actions`] to take on the two periodic
//! activities. Callers apply the actions; nothing assigns state directly, so
//! every arm/halt decision lives in one table.
//!
//! ```text
//! Stopped ──start──► Running ──pause / quiesce──► Paused ──start──► Running ...
//!    ▲                                                              │
//!    └───────────────────────── stop ◄──────────────────────────────┘
//! ```
//!
//! `Pause` halts only the dispatch activity: statistics keep running so the
//! drain condition can still be observed and published. `Quiesce` is the
//! statistics activity reporting that condition; it halts both.

/// Lifecycle state of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Never started, or destroyed.
    Stopped,
    /// Both periodic activities armed; tasks are being admitted.
    Running,
    /// Admission halted; in-flight tasks keep running to completion.
    Paused,
}

/// Requested state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request {
    /// Caller wants dispatch to run.
    Start,
    /// Caller wants admission to stop (pause-until-drained).
    Pause,
    /// The statistics activity observed quiescence.
    Quiesce,
    /// Hard teardown.
    Stop,
}

/// Activity changes a transition demands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Actions {
    pub(crate) arm_dispatch: bool,
    pub(crate) arm_stats: bool,
    pub(crate) halt_dispatch: bool,
    pub(crate) halt_stats: bool,
}

impl Actions {
    const NONE: Actions = Actions {
        arm_dispatch: false,
        arm_stats: false,
        halt_dispatch: false,
        halt_stats: false,
    };

    const ARM_ALL: Actions = Actions {
        arm_dispatch: true,
        arm_stats: true,
        halt_dispatch: false,
        halt_stats: false,
    };

    const HALT_ALL: Actions = Actions {
        arm_dispatch: false,
        arm_stats: false,
        halt_dispatch: true,
        halt_stats: true,
    };

    const HALT_DISPATCH: Actions = Actions {
        arm_dispatch: false,
        arm_stats: false,
        halt_dispatch: true,
        halt_stats: false,
    };

    const HALT_STATS: Actions = Actions {
        arm_dispatch: false,
        arm_stats: false,
        halt_dispatch: false,
        halt_stats: true,
    };
}

/// Computes the next state and the activity actions for a request.
pub(crate) fn transition(current: State, request: Request) -> (State, Actions) {
    use Request::*;
    use State::*;

    match (current, request) {
        (Stopped | Paused, Start) => (Running, Actions::ARM_ALL),
        (Running, Start) => (Running, Actions::NONE),

        (Running, Pause) => (Paused, Actions::HALT_DISPATCH),
        (Stopped | Paused, Pause) => (current, Actions::NONE),

        (Running, Quiesce) => (Paused, Actions::HALT_ALL),
        (Paused | Stopped, Quiesce) => (current, Actions::HALT_STATS),

        (_, Stop) => (Stopped, Actions::HALT_ALL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_arms_both_activities() {
        let (next, actions) = transition(State::Stopped, Request::Start);
        assert_eq!(next, State::Running);
        assert_eq!(actions, Actions::ARM_ALL);

        let (next, actions) = transition(State::Paused, Request::Start);
        assert_eq!(next, State::Running);
        assert_eq!(actions, Actions::ARM_ALL);
    }

    #[test]
    fn test_start_while_running_is_a_no_op() {
        let (next, actions) = transition(State::Running, Request::Start);
        assert_eq!(next, State::Running);
        assert_eq!(actions, Actions::NONE);
    }

    #[test]
    fn test_pause_halts_dispatch_but_keeps_stats() {
        let (next, actions) = transition(State::Running, Request::Pause);
        assert_eq!(next, State::Paused);
        assert!(actions.halt_dispatch);
        assert!(!actions.halt_stats);
        assert!(!actions.arm_dispatch && !actions.arm_stats);
    }

    #[test]
    fn test_pause_outside_running_changes_nothing() {
        for state in [State::Stopped, State::Paused] {
            let (next, actions) = transition(state, Request::Pause);
            assert_eq!(next, state);
            assert_eq!(actions, Actions::NONE);
        }
    }

    #[test]
    fn test_quiesce_halts_everything_and_pauses() {
        let (next, actions) = transition(State::Running, Request::Quiesce);
        assert_eq!(next, State::Paused);
        assert_eq!(actions, Actions::HALT_ALL);

        let (next, actions) = transition(State::Paused, Request::Quiesce);
        assert_eq!(next, State::Paused);
        assert_eq!(actions, Actions::HALT_STATS);
    }

    #[test]
    fn test_stop_always_halts_both() {
        for state in [State::Stopped, State::Running, State::Paused] {
            let (next, actions) = transition(state, Request::Stop);
            assert_eq!(next, State::Stopped);
            assert_eq!(actions, Actions::HALT_ALL);
        }
    }

    #[test]
    fn test_no_transition_arms_and_halts_the_same_activity() {
        use Request::*;
        use State::*;
        for state in [Stopped, Running, Paused] {
            for request in [Start, Pause, Quiesce, Stop] {
                let (_, actions) = transition(state, request);
                assert!(!(actions.arm_dispatch && actions.halt_dispatch));
                assert!(!(actions.arm_stats && actions.halt_stats));
            }
        }
    }
}
