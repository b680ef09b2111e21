//! Timeline interpreter
//!
//! `Timeline::advance` is the per-frame entry point: the cursor moves by the
//! frame's delta, then every queue at or before it drains in step order.
//! All world access goes through the [`CommandHost`] seam, so the session
//! wires in its whitelist dispatch and tests substitute a mock.
//!
//! Control commands resolve as follows:
//! - `timeline` ends the whole pass for this tick; the new program starts
//!   from cursor 0 next tick.
//! - `skip_to` discards queues below the target and keeps draining, so the
//!   target step runs in the same tick.
//! - a false `if`/`if_watched`/`if_not_watched`/`while` guard discards the
//!   rest of its step only; later due steps still run this tick.
//! - a true `while` re-queues itself and copies the remaining body one step
//!   earlier, rewinding the cursor one unit, so each loop iteration costs
//!   one unit of cursor budget and re-runs within the same tick while that
//!   budget lasts.

use super::command::{Command, parse_line};
use super::expr::{self, Value};
use super::program::{Step, Timeline, TimelineScript};

/// World access for the interpreter.
///
/// Every method is non-fatal; errors come back as strings and end up as
/// diagnostics, never aborts.
pub trait CommandHost {
    /// Identifier lookup for expressions
    fn lookup(&self, name: &str) -> Option<Value>;
    /// Assign a script variable (`exec`)
    fn assign(&mut self, name: &str, value: Value);
    /// `setattr` dispatch through the field whitelist
    fn set_field(&mut self, target: &str, field: &str, value: Value) -> Result<(), String>;
    /// `call` dispatch; unknown targets and methods no-op
    fn call_method(&mut self, target: &str, method: &str, args: &[Value]);
    /// Open a modal text box
    fn dialog(&mut self, portrait: &str, text: &str);
    /// Request music playback
    fn play_music(&mut self, name: &str);
    /// Load a script for a `timeline` switch
    fn fetch_script(&mut self, name: &str) -> Result<TimelineScript, String>;
    /// Watched-timeline set membership
    fn is_watched(&self, name: &str) -> bool;
    /// Record a fully-run script
    fn mark_watched(&mut self, name: &str);
    /// Surface a non-fatal script diagnostic
    fn script_error(&mut self, context: &str, message: &str);
}

enum StepOutcome {
    /// Keep draining due steps
    Continue,
    /// A program switch ended this tick's pass
    StopTick,
}

impl Timeline {
    /// Advance the cursor by `delta` steps and execute everything due.
    ///
    /// Identical total advancement produces an identical executed-command
    /// sequence no matter how the delta is chunked across calls.
    pub fn advance(&mut self, delta: f32, host: &mut dyn CommandHost) {
        self.cursor += delta;
        loop {
            let Some(step) = self.first_due() else { break };
            match self.run_queue(step, host) {
                StepOutcome::Continue => {}
                StepOutcome::StopTick => return,
            }
        }
        // The program ran out with nothing left due: a named script that
        // reached this point has been seen end to end.
        if self.program.is_empty() && !self.name.is_empty() {
            if !host.is_watched(&self.name) {
                host.mark_watched(&self.name);
            }
            self.name.clear();
        }
    }

    fn pop_front(&mut self, step: Step) -> Option<String> {
        let queue = self.program.get_mut(&step)?;
        let line = queue.pop_front();
        if queue.is_empty() {
            self.program.remove(&step);
        }
        line
    }

    fn run_queue(&mut self, step: Step, host: &mut dyn CommandHost) -> StepOutcome {
        while let Some(line) = self.pop_front(step) {
            let Some(cmd) = parse_line(&line) else {
                // Malformed or unknown; scripts degrade, not abort
                continue;
            };
            match cmd {
                Command::Comment => {}
                Command::SetAttr {
                    target,
                    field,
                    expr,
                } => match self.eval(&expr, host) {
                    Ok(value) => self.apply_setattr(&target, &field, value, host),
                    Err(msg) => host.script_error("setattr", &msg),
                },
                Command::Call {
                    target,
                    method,
                    args,
                } => {
                    let mut values = Vec::with_capacity(args.len());
                    let mut failed = false;
                    for arg in &args {
                        match self.eval(arg, host) {
                            Ok(v) => values.push(v),
                            Err(msg) => {
                                host.script_error("call", &msg);
                                failed = true;
                                break;
                            }
                        }
                    }
                    if failed {
                        continue;
                    }
                    match self.intercept_call(step, &target, &method, &values, host) {
                        Some(StepOutcome::StopTick) => return StepOutcome::StopTick,
                        Some(StepOutcome::Continue) => return StepOutcome::Continue,
                        None => host.call_method(&target, &method, &values),
                    }
                }
                Command::Dialog { portrait, text } => host.dialog(&portrait, &text),
                Command::PlayMusic { name } => host.play_music(&name),
                Command::SwitchTimeline { name } => {
                    return self.switch(step, &name, host);
                }
                Command::SkipTo { step: target } => {
                    self.skip_to(target);
                    return StepOutcome::Continue;
                }
                Command::Exec { name, expr } => match self.eval(&expr, host) {
                    Ok(value) => host.assign(&name, value),
                    Err(msg) => host.script_error("exec", &msg),
                },
                Command::If { expr } => {
                    let pass = match self.eval(&expr, host) {
                        Ok(v) => v.truthy(),
                        Err(msg) => {
                            host.script_error("if", &msg);
                            false
                        }
                    };
                    if !pass {
                        self.program.remove(&step);
                        return StepOutcome::Continue;
                    }
                }
                Command::IfWatched { name } => {
                    if !self.watched_arg(&name, host) {
                        self.program.remove(&step);
                        return StepOutcome::Continue;
                    }
                }
                Command::IfNotWatched { name } => {
                    if self.watched_arg(&name, host) {
                        self.program.remove(&step);
                        return StepOutcome::Continue;
                    }
                }
                Command::While { expr } => {
                    let pass = match self.eval(&expr, host) {
                        Ok(v) => v.truthy(),
                        Err(msg) => {
                            host.script_error("while", &msg);
                            false
                        }
                    };
                    if !pass {
                        self.program.remove(&step);
                        return StepOutcome::Continue;
                    }
                    // Re-queue the guard at this step and copy the body one
                    // step earlier; the rewound cursor pays for the
                    // iteration.
                    let body = self.program.remove(&step).unwrap_or_default();
                    let mut requeued = body.clone();
                    requeued.push_front(line.clone());
                    self.program.insert(step, requeued);
                    if !body.is_empty() {
                        self.program.insert(Step(step.0 - 1.0), body);
                    }
                    self.cursor -= 1.0;
                    return StepOutcome::Continue;
                }
            }
        }
        StepOutcome::Continue
    }

    fn eval(&self, expr: &str, host: &dyn CommandHost) -> Result<Value, String> {
        let cursor = self.cursor;
        expr::eval(expr, &|name| {
            if name == "step" {
                Some(Value::Num(cursor as f64))
            } else {
                host.lookup(name)
            }
        })
    }

    fn watched_arg(&self, name: &str, host: &dyn CommandHost) -> bool {
        let name = if name.is_empty() { &self.name } else { name };
        host.is_watched(name)
    }

    fn apply_setattr(
        &mut self,
        target: &str,
        field: &str,
        value: Value,
        host: &mut dyn CommandHost,
    ) {
        // The skip target lives on the timeline itself
        if target == crate::constants::LEVEL_TARGET_ID && field == "timeline_skip_target" {
            match value.as_num() {
                Some(n) => self.skip_target = Some(n as f32),
                None => host.script_error("setattr", "timeline_skip_target needs a number"),
            }
            return;
        }
        if let Err(msg) = host.set_field(target, field, value) {
            host.script_error("setattr", &msg);
        }
    }

    /// Timeline-owned methods reachable through `call __level__ ...`
    fn intercept_call(
        &mut self,
        step: Step,
        target: &str,
        method: &str,
        args: &[Value],
        host: &mut dyn CommandHost,
    ) -> Option<StepOutcome> {
        if target != crate::constants::LEVEL_TARGET_ID {
            return None;
        }
        match (method, args) {
            ("load_timeline", [Value::Str(name)]) => {
                let name = name.clone();
                Some(self.switch(step, &name, host))
            }
            ("timeline_skipto", [v]) => {
                let n = v.as_num()? as f32;
                self.skip_to(n);
                Some(StepOutcome::Continue)
            }
            _ => None,
        }
    }

    fn switch(&mut self, step: Step, new_name: &str, host: &mut dyn CommandHost) -> StepOutcome {
        // The rest of this step dies with the old program; the old name is
        // watched only if nothing else remained.
        self.program.remove(&step);
        if self.program.is_empty() && !self.name.is_empty() && !host.is_watched(&self.name) {
            host.mark_watched(&self.name);
        }
        match host.fetch_script(new_name) {
            Ok(script) => self.install(new_name, &script),
            Err(msg) => {
                host.script_error("timeline", &msg);
                self.clear();
            }
        }
        StepOutcome::StopTick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::program::ScriptStep;
    use std::collections::HashMap;

    /// Records every host interaction for assertions
    #[derive(Default)]
    struct MockHost {
        vars: HashMap<String, Value>,
        watched: Vec<String>,
        scripts: HashMap<String, TimelineScript>,
        log: Vec<String>,
        errors: Vec<String>,
    }

    impl CommandHost for MockHost {
        fn lookup(&self, name: &str) -> Option<Value> {
            self.vars.get(name).cloned()
        }

        fn assign(&mut self, name: &str, value: Value) {
            self.log.push(format!("assign {} {}", name, value));
            self.vars.insert(name.to_string(), value);
        }

        fn set_field(&mut self, target: &str, field: &str, value: Value) -> Result<(), String> {
            self.log.push(format!("set {} {} {}", target, field, value));
            Ok(())
        }

        fn call_method(&mut self, target: &str, method: &str, args: &[Value]) {
            let args: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            self.log
                .push(format!("call {} {} [{}]", target, method, args.join(",")));
        }

        fn dialog(&mut self, portrait: &str, text: &str) {
            self.log.push(format!("dialog {} {}", portrait, text));
        }

        fn play_music(&mut self, name: &str) {
            self.log.push(format!("music {}", name));
        }

        fn fetch_script(&mut self, name: &str) -> Result<TimelineScript, String> {
            self.scripts
                .get(name)
                .cloned()
                .ok_or(format!("no such timeline '{}'", name))
        }

        fn is_watched(&self, name: &str) -> bool {
            self.watched.iter().any(|w| w == name)
        }

        fn mark_watched(&mut self, name: &str) {
            self.watched.push(name.to_string());
        }

        fn script_error(&mut self, context: &str, message: &str) {
            self.errors.push(format!("{}: {}", context, message));
        }
    }

    fn staircase() -> Timeline {
        let mut t = Timeline::default();
        t.name = "stairs".to_string();
        t.push(0.0, "dialog a zero");
        t.push(1.0, "dialog a one");
        t.push(2.0, "dialog a two");
        t.push(3.0, "dialog a three");
        t
    }

    #[test]
    fn test_chunking_determinism() {
        let mut big = staircase();
        let mut big_host = MockHost::default();
        big.advance(4.0, &mut big_host);

        let mut small = staircase();
        let mut small_host = MockHost::default();
        for _ in 0..8 {
            small.advance(0.5, &mut small_host);
        }

        assert_eq!(big_host.log, small_host.log);
        assert_eq!(big_host.log.len(), 4);
        assert_eq!(big.cursor, small.cursor);
    }

    #[test]
    fn test_skip_to_clears_below_target() {
        let mut t = Timeline::default();
        t.push(0.0, "skip_to 3");
        t.push(1.0, "dialog a skipped");
        t.push(2.0, "dialog a skipped");
        t.push(3.0, "dialog a landed");
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert_eq!(host.log, vec!["dialog a landed"]);
        assert_eq!(t.cursor, 3.0);
    }

    #[test]
    fn test_skip_to_then_zero_advance() {
        let mut t = Timeline::default();
        t.push(1.0, "dialog a skipped");
        t.push(5.0, "dialog a target");
        t.skip_to(5.0);
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert_eq!(host.log, vec!["dialog a target"]);
        assert_eq!(t.cursor, 5.0);
    }

    #[test]
    fn test_while_runs_body_exactly_k_times() {
        let mut t = Timeline::default();
        t.push(2.0, "while n < 3");
        t.push(2.0, "call __level__ ding");
        t.push(2.0, "exec n = n + 1");
        let mut host = MockHost::default();
        host.vars.insert("n".to_string(), Value::Num(0.0));
        t.advance(10.0, &mut host);
        let dings = host.log.iter().filter(|l| l.contains("ding")).count();
        assert_eq!(dings, 3);
        assert_eq!(host.vars.get("n"), Some(&Value::Num(3.0)));
        // Three iterations rewound the cursor three units
        assert_eq!(t.cursor, 7.0);
        assert!(t.is_exhausted());
    }

    #[test]
    fn test_while_false_discards_body() {
        let mut t = Timeline::default();
        t.push(0.0, "while false");
        t.push(0.0, "dialog a never");
        t.push(1.0, "dialog a after");
        let mut host = MockHost::default();
        t.advance(1.0, &mut host);
        assert_eq!(host.log, vec!["dialog a after"]);
    }

    #[test]
    fn test_while_iterates_across_ticks_when_budget_runs_out() {
        let mut t = Timeline::default();
        t.push(1.0, "while n < 2");
        t.push(1.0, "exec n = n + 1");
        let mut host = MockHost::default();
        host.vars.insert("n".to_string(), Value::Num(0.0));
        // Cursor reaches 1.0: one iteration, budget spent
        t.advance(1.0, &mut host);
        assert_eq!(host.vars.get("n"), Some(&Value::Num(1.0)));
        // More budget finishes the loop
        t.advance(2.0, &mut host);
        assert_eq!(host.vars.get("n"), Some(&Value::Num(2.0)));
        assert!(t.is_exhausted());
    }

    #[test]
    fn test_if_false_stops_only_its_step() {
        let mut t = Timeline::default();
        t.push(0.0, "if 1 > 2");
        t.push(0.0, "dialog a never");
        t.push(1.0, "dialog a still_runs");
        let mut host = MockHost::default();
        t.advance(1.0, &mut host);
        assert_eq!(host.log, vec!["dialog a still_runs"]);
    }

    #[test]
    fn test_if_true_continues_step() {
        let mut t = Timeline::default();
        t.push(0.0, "if 2 > 1");
        t.push(0.0, "dialog a yes");
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert_eq!(host.log, vec!["dialog a yes"]);
    }

    #[test]
    fn test_if_watched_gates_on_membership() {
        let mut t = Timeline::default();
        t.name = "rerun".to_string();
        t.push(0.0, "if_not_watched");
        t.push(0.0, "dialog a first_time_only");
        let mut host = MockHost::default();
        host.watched.push("rerun".to_string());
        t.advance(0.0, &mut host);
        assert!(host.log.is_empty());

        let mut t = Timeline::default();
        t.name = "rerun".to_string();
        t.push(0.0, "if_not_watched");
        t.push(0.0, "dialog a first_time_only");
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert_eq!(host.log, vec!["dialog a first_time_only"]);
    }

    #[test]
    fn test_if_watched_named_script() {
        let mut t = Timeline::default();
        t.push(0.0, "if_watched intro");
        t.push(0.0, "dialog a seen_intro");
        let mut host = MockHost::default();
        host.watched.push("intro".to_string());
        t.advance(0.0, &mut host);
        assert_eq!(host.log, vec!["dialog a seen_intro"]);
    }

    #[test]
    fn test_switch_stops_tick_and_resets_cursor() {
        let mut t = Timeline::default();
        t.name = "first".to_string();
        t.push(0.0, "timeline second");
        t.push(0.0, "dialog a discarded");
        let mut host = MockHost::default();
        host.scripts.insert(
            "second".to_string(),
            TimelineScript {
                step: vec![ScriptStep {
                    at: 0.0,
                    run: vec!["dialog b hello".to_string()],
                }],
            },
        );
        t.advance(2.0, &mut host);
        // Switch ends the pass; the new program waits for the next tick
        assert!(host.log.is_empty());
        assert_eq!(t.name, "second");
        assert_eq!(t.cursor, 0.0);
        // Old program ended at its switch point, so it counts as watched
        assert!(host.is_watched("first"));

        t.advance(0.5, &mut host);
        assert_eq!(host.log, vec!["dialog b hello"]);
    }

    #[test]
    fn test_switch_with_pending_steps_is_not_watched() {
        let mut t = Timeline::default();
        t.name = "first".to_string();
        t.push(0.0, "timeline second");
        t.push(5.0, "dialog a unreachable");
        let mut host = MockHost::default();
        host.scripts
            .insert("second".to_string(), TimelineScript::default());
        t.advance(0.0, &mut host);
        assert!(!host.is_watched("first"));
        assert_eq!(t.name, "second");
    }

    #[test]
    fn test_switch_to_missing_script_reports_and_clears() {
        let mut t = Timeline::default();
        t.name = "first".to_string();
        t.push(0.0, "timeline nowhere");
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert_eq!(host.errors.len(), 1);
        assert!(t.name.is_empty());
        assert!(t.is_exhausted());
    }

    #[test]
    fn test_exhaustion_marks_watched() {
        let mut t = Timeline::default();
        t.name = "outro".to_string();
        t.push(0.0, "dialog a bye");
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert!(host.is_watched("outro"));
        assert!(t.name.is_empty());
        // Marked once, not every frame
        t.advance(1.0, &mut host);
        assert_eq!(host.watched.len(), 1);
    }

    #[test]
    fn test_eval_failure_is_nonfatal() {
        let mut t = Timeline::default();
        t.push(0.0, "setattr hero hp missing_var + 1");
        t.push(0.0, "dialog a survived");
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert_eq!(host.errors.len(), 1);
        assert_eq!(host.log, vec!["dialog a survived"]);
    }

    #[test]
    fn test_unknown_commands_ignored() {
        let mut t = Timeline::default();
        t.push(0.0, "explode everything");
        t.push(0.0, "# just a note");
        t.push(0.0, "dialog a fine");
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert_eq!(host.log, vec!["dialog a fine"]);
        assert!(host.errors.is_empty());
    }

    #[test]
    fn test_setattr_and_call_dispatch() {
        let mut t = Timeline::default();
        t.push(0.0, "setattr snowman frozen true");
        t.push(0.0, "call snowman hurt 1 + 1");
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert_eq!(
            host.log,
            vec!["set snowman frozen true", "call snowman hurt [2]"]
        );
    }

    #[test]
    fn test_step_variable_tracks_cursor() {
        let mut t = Timeline::default();
        t.push(2.0, "exec here = step");
        let mut host = MockHost::default();
        t.advance(3.5, &mut host);
        assert_eq!(host.vars.get("here"), Some(&Value::Num(3.5)));
    }

    #[test]
    fn test_skip_target_setattr_intercepted() {
        let mut t = Timeline::default();
        t.push(0.0, "setattr __level__ timeline_skip_target 12");
        let mut host = MockHost::default();
        t.advance(0.0, &mut host);
        assert_eq!(t.skip_target, Some(12.0));
        assert!(host.log.is_empty());
    }
}
