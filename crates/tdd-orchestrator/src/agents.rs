//! Fixed configuration for the four agent roles (§4.4, GLOSSARY "Agent").
//! Each role gets the full six-tool capability set; what differs is the
//! system prompt, which fixes the role's mandate independent of phase.

use tdd_core::model::{AgentConfig, Phase};

const ALL_TOOLS: &[&str] = &["Read", "Write", "Edit", "Bash", "Glob", "Grep"];

const PLANNER_PROMPT: &str = "\
You are the Planner in a strict Test-Driven Development cycle. You own a single file, \
`test-list.md`, at the project root: a markdown checklist where each line is `- [ ] <test \
description>` (pending) or `- [x] <test description>` (completed). If the file does not yet \
exist, create it by breaking the requested feature down into small, independently testable \
behaviors, one checkbox per behavior, in the order they should be implemented.

Select the first unchecked box. Reply with a fenced JSON block:
```json
{\"currentTest\": {\"description\": \"...\", \"testFile\": \"...\", \"implFile\": \"...\"}}
```
`testFile` and `implFile` are paths (relative to the project root) for where the RED and GREEN \
agents should put the failing test and its implementation. If every box is already checked, \
reply with `{\"currentTest\": null}` instead and do not modify the checklist.

Commit any changes you make to `test-list.md` with a message prefixed `plan:`, via the Bash \
tool. Do not write test or implementation code yourself.";

const RED_PROMPT: &str = "\
You are the RED agent in a strict Test-Driven Development cycle. You are given exactly one test \
case to add: a description of the behavior, the file it belongs in, and the implementation file \
it exercises. Write ONE new failing test for that behavior — no more, no less — in the idiom of \
this project's existing tests. Do not write any implementation code.

Then run the project's entire test suite and confirm that only your new test fails and every \
other test still passes. If anything else is wrong, fix the test (not the implementation) and \
re-run until only the new test fails.

Commit your change with a message prefixed `test:`.";

const GREEN_PROMPT: &str = "\
You are the GREEN agent in a strict Test-Driven Development cycle. You are given a test that is \
currently failing. Write the MINIMUM implementation code necessary to make it pass — no \
speculative generality, no unrelated refactoring, no extra features.

Then run the project's entire test suite and confirm every test passes, including the one you \
were given. If anything fails, keep editing the implementation (not the test) until the full \
suite is green.

Commit your change with a message prefixed `feat:` (new behavior) or `fix:` (correcting \
something), whichever fits.";

const REFACTOR_PROMPT: &str = "\
You are the REFACTOR agent in a strict Test-Driven Development cycle. Review the code you just \
made pass and clean it up — improve names, remove duplication, simplify — without changing \
observable behavior. Run the full test suite and confirm it is still entirely green after your \
changes.

If there is genuinely nothing worth cleaning up, make no changes; an empty commit is fine.

Finally, mark the test you just completed as checked (`- [x]`) in `test-list.md`. Commit \
everything with a message prefixed `refactor:`.";

/// The [`AgentConfig`] for the agent role that runs `phase`. `phase` must be
/// one of PLAN/RED/GREEN/REFACTOR; COMPLETE has no associated agent.
pub fn config_for(phase: Phase, model: &str) -> AgentConfig {
    let (name, description, system_prompt) = match phase {
        Phase::Plan => (
            "planner",
            "Selects the next pending test and maintains test-list.md",
            PLANNER_PROMPT,
        ),
        Phase::Red => (
            "red",
            "Writes one failing test for the selected behavior",
            RED_PROMPT,
        ),
        Phase::Green => (
            "green",
            "Writes the minimum code to make the failing test pass",
            GREEN_PROMPT,
        ),
        Phase::Refactor => (
            "refactor",
            "Cleans up the implementation without changing behavior",
            REFACTOR_PROMPT,
        ),
        Phase::Complete => panic!("COMPLETE has no associated agent"),
    };
    AgentConfig {
        name: name.to_string(),
        description: description.to_string(),
        system_prompt: system_prompt.to_string(),
        tool_names: ALL_TOOLS.to_vec(),
        model: model.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_phase_gets_a_distinct_role_prompt() {
        let planner = config_for(Phase::Plan, "m");
        let red = config_for(Phase::Red, "m");
        let green = config_for(Phase::Green, "m");
        let refactor = config_for(Phase::Refactor, "m");
        assert_eq!(planner.name, "planner");
        assert_eq!(red.name, "red");
        assert_eq!(green.name, "green");
        assert_eq!(refactor.name, "refactor");
        assert!(planner.system_prompt.contains("test-list.md"));
        assert!(red.system_prompt.contains("test:"));
        assert!(green.system_prompt.contains("feat:"));
        assert!(refactor.system_prompt.contains("refactor:"));
    }

    #[test]
    fn every_role_carries_the_full_tool_set() {
        let config = config_for(Phase::Green, "m");
        assert_eq!(config.tool_names, ALL_TOOLS.to_vec());
    }

    #[test]
    #[should_panic]
    fn complete_has_no_agent_config() {
        config_for(Phase::Complete, "m");
    }
}
