//! Built-in `Given`/`When`/`Then` step library: the vocabulary every
//! `.feature` file gets for free, covering mock configuration, running the
//! procedure under test, and asserting on its outcome. A harness registers
//! these before any caller-supplied steps, so a caller's own steps can
//! shadow a built-in by registering the same pattern text first.

use serde_json::Value;
use tactus_core::effect::Scope;

use crate::error::BddError;
use crate::matcher::StepRegistry;
use crate::mock_provider::ScriptedTurn;
use crate::scenario::World;

fn parse_json_arg(text: &str) -> Result<Value, BddError> {
    serde_json::from_str(text)
        .map_err(|e| BddError::StepArgument {
            step: text.to_string(),
            message: e.to_string(),
        })
}

/// Register every built-in step. Called once per [`crate::harness::BddHarness`].
pub fn register_builtins(registry: &mut StepRegistry) -> Result<(), BddError> {
    use crate::feature::StepKeyword::{Given, Then, When};

    registry.register(Given, "the agent {string} responds with {string}", |caps, world| {
        world.provider_script.push(ScriptedTurn::Text(caps[1].clone()));
        let _ = &caps[0]; // agent name: every agent shares one provider mock, see MockProvider's doc comment.
        Ok(())
    })?;

    registry.register(
        Given,
        "the agent {string} calls tool {string} with {string}",
        |caps, world| {
            let input = parse_json_arg(&caps[2])?;
            world
                .provider_script
                .push(ScriptedTurn::ToolCall { name: caps[1].clone(), input });
            Ok(())
        },
    )?;

    registry.register(Given, "the agent {string} calls tool {string}", |caps, world| {
        world.provider_script.push(ScriptedTurn::ToolCall {
            name: caps[1].clone(),
            input: Value::Object(Default::default()),
        });
        Ok(())
    })?;

    registry.register(
        Given,
        "the tool {string} called with {string} returns {string}",
        |caps, world| {
            let input = parse_json_arg(&caps[1])?;
            let output = parse_json_arg(&caps[2])?;
            world.tool_responses.push((caps[0].clone(), input, output));
            Ok(())
        },
    )?;

    registry.register(Given, "the human approves every request", |_caps, world| {
        world.hitl = tactus_hitl::MockHitlHandler::auto_approve();
        Ok(())
    })?;

    registry.register(Given, "the human rejects every request", |_caps, world| {
        world.hitl = tactus_hitl::MockHitlHandler::auto_reject();
        Ok(())
    })?;

    registry.register(Given, "the human never responds", |_caps, world| {
        world.hitl = tactus_hitl::MockHitlHandler::hang();
        Ok(())
    })?;

    registry.register(
        Given,
        "the human responds to {string} with {string}",
        |caps, world| {
            let value = parse_json_arg(&caps[1])?;
            world.hitl = std::mem::take(&mut world.hitl).script(caps[0].clone(), value);
            Ok(())
        },
    )?;

    registry.register(Given, "the parameter {string} is {string}", |caps, world| {
        let value = parse_json_arg(&caps[1])?;
        if let Value::Object(map) = &mut world.params {
            map.insert(caps[0].clone(), value);
        }
        Ok(())
    })?;

    // Seeds state at the invocation scope the first (and, in every BDD
    // scenario, only) spawned invocation of this procedure runs under —
    // see run.rs's doc comment on why "{procedure}-1" is safe to predict.
    registry.register(
        Given,
        "the state {string} is {string}",
        |caps, world| {
            let value = parse_json_arg(&caps[1])?;
            let scope = Scope::Custom(format!("invocation:{}-1", world.procedure));
            world.state_seed.push((scope, caps[0].clone(), value));
            Ok(())
        },
    )?;

    registry.register(When, "the procedure runs", |_caps, _world| {
        // Resolved in harness.rs, which actually drives run::run — step
        // handlers are synchronous, and running a procedure is not.
        Ok(())
    })?;

    registry.register(Then, "it should succeed", |_caps, world| {
        if !world.outcome()?.succeeded() {
            return Err(BddError::AssertionFailed(format!(
                "expected the procedure to succeed, got {:?}",
                world.outcome()?.result
            )));
        }
        Ok(())
    })?;

    registry.register(Then, "it should fail", |_caps, world| {
        if world.outcome()?.succeeded() {
            return Err(BddError::AssertionFailed(
                "expected the procedure to fail, but it succeeded".to_string(),
            ));
        }
        Ok(())
    })?;

    registry.register(Then, "it should fail with {string}", |caps, world| {
        let outcome = world.outcome()?;
        match &outcome.result {
            Ok(_) => Err(BddError::AssertionFailed(
                "expected the procedure to fail, but it succeeded".to_string(),
            )),
            Err(message) if message.contains(caps[0].as_str()) => Ok(()),
            Err(message) => Err(BddError::AssertionFailed(format!(
                "expected failure message to contain {:?}, got {message:?}",
                caps[0]
            ))),
        }
    })?;

    registry.register(Then, "the tool {string} should have been called", |caps, world| {
        if !world.outcome()?.tool_called(&caps[0]) {
            return Err(BddError::AssertionFailed(format!(
                "expected tool {:?} to have been called",
                caps[0]
            )));
        }
        Ok(())
    })?;

    registry.register(
        Then,
        "the tool {string} should not have been called",
        |caps, world| {
            if world.outcome()?.tool_called(&caps[0]) {
                return Err(BddError::AssertionFailed(format!(
                    "expected tool {:?} to not have been called",
                    caps[0]
                )));
            }
            Ok(())
        },
    )?;

    registry.register(Then, "the stage should be {string}", |caps, world| {
        let outcome = world.outcome()?;
        if outcome.stage.as_deref() != Some(caps[0].as_str()) {
            return Err(BddError::AssertionFailed(format!(
                "expected stage {:?}, got {:?}",
                caps[0], outcome.stage
            )));
        }
        Ok(())
    })?;

    registry.register(
        Then,
        "there should be at most {int} iterations",
        |caps, world| {
            let limit: u32 = caps[0].parse().map_err(|_| BddError::StepArgument {
                step: caps[0].clone(),
                message: "not an integer".to_string(),
            })?;
            let outcome = world.outcome()?;
            if outcome.iterations > limit {
                return Err(BddError::AssertionFailed(format!(
                    "expected at most {limit} iterations, got {}",
                    outcome.iterations
                )));
            }
            Ok(())
        },
    )?;

    registry.register(Then, "the result should be {string}", |caps, world| {
        let expected = parse_json_arg(&caps[0])?;
        let outcome = world.outcome()?;
        match &outcome.result {
            Ok(actual) if *actual == expected => Ok(()),
            Ok(actual) => Err(BddError::AssertionFailed(format!(
                "expected result {expected:?}, got {actual:?}"
            ))),
            Err(message) => Err(BddError::AssertionFailed(format!(
                "expected a successful result of {expected:?}, but the procedure failed: {message}"
            ))),
        }
    })?;

    Ok(())
}
