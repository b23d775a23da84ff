//! Credentials: attestations one agent issues about another.

use agora_types::{
    ActionIntent, ActionParams, ActionType, Agent, Credential, CredentialId, EventType,
    WorldEffect,
};
use serde_json::json;

use super::costs::affordable_cost;
use super::{ActionHandler, Resolution, ResolutionContext, ensure_in_range};
use crate::error::ActionError;

/// Handler for `issue_credential`.
pub struct IssueCredentialHandler;

impl ActionHandler for IssueCredentialHandler {
    fn action_type(&self) -> ActionType {
        ActionType::IssueCredential
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::IssueCredential { subject, title } = &intent.params else {
            return Err(ActionError::InvalidParameter(
                "expected issue_credential parameters".to_owned(),
            ));
        };
        let holder = ctx.living_target(agent, *subject)?;
        ensure_in_range(agent, holder, ctx.config.communication_range)?;
        let title = title.trim();
        let length = title.chars().count();
        if length == 0 || length > ctx.config.max_credential_title_chars {
            return Err(ActionError::InvalidParameter(format!(
                "title must be between 1 and {} characters, got {length}",
                ctx.config.max_credential_title_chars
            )));
        }
        let duplicate = ctx.world.credentials.values().any(|c| {
            c.issuer == agent.id
                && c.subject == holder.id
                && c.title == title
                && c.revoked_tick.is_none()
        });
        if duplicate {
            return Err(ActionError::DuplicateCredential);
        }
        let cost = affordable_cost(agent, ActionType::IssueCredential, ctx.config)?;

        let credential = Credential {
            id: CredentialId::from_random_bytes(ctx.id_bytes()),
            issuer: agent.id,
            subject: holder.id,
            title: title.to_owned(),
            issued_tick: ctx.tick,
            revoked_tick: None,
        };
        let mut resolution = Resolution::charged(&cost);
        resolution.events.push(ctx.event(
            EventType::CredentialIssued,
            agent.id,
            json!({
                "credentialId": credential.id,
                "subject": credential.subject,
                "title": credential.title,
            }),
        ));
        resolution
            .effects
            .push(WorldEffect::IssueCredential { credential });
        Ok(resolution)
    }
}

/// Handler for `revoke_credential`. Only the issuer may revoke.
pub struct RevokeCredentialHandler;

impl ActionHandler for RevokeCredentialHandler {
    fn action_type(&self) -> ActionType {
        ActionType::RevokeCredential
    }

    fn resolve(
        &self,
        intent: &ActionIntent,
        agent: &Agent,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Resolution, ActionError> {
        let ActionParams::RevokeCredential { credential_id } = intent.params else {
            return Err(ActionError::InvalidParameter(
                "expected revoke_credential parameters".to_owned(),
            ));
        };
        let credential = ctx
            .world
            .credentials
            .get(&credential_id)
            .ok_or(ActionError::CredentialNotFound(credential_id))?;
        if credential.issuer != agent.id {
            return Err(ActionError::NotIssuer);
        }
        if credential.revoked_tick.is_some() {
            return Err(ActionError::AlreadyRevoked);
        }
        let cost = affordable_cost(agent, ActionType::RevokeCredential, ctx.config)?;

        let mut resolution = Resolution::charged(&cost);
        resolution.effects.push(WorldEffect::RevokeCredential {
            credential_id,
            tick: ctx.tick,
        });
        resolution.events.push(ctx.event(
            EventType::CredentialRevoked,
            agent.id,
            json!({
                "credentialId": credential_id,
                "subject": credential.subject,
                "title": credential.title,
            }),
        ));
        Ok(resolution)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::actions::test_util::{error_of, resolve};
    use crate::test_support::{agent_at, world_with};
    use crate::world_state::WorldState;

    fn issue(world: &mut WorldState, issuer: &Agent, subject: &Agent, title: &str) -> CredentialId {
        let params = ActionParams::IssueCredential {
            subject: subject.id,
            title: title.to_owned(),
        };
        let snapshot = world.clone();
        let result = resolve(&snapshot, issuer.id, params.clone());
        assert!(result.success, "{:?}", result.error);
        let intent = ActionIntent::new(issuer.id, params, world.tick);
        world.apply_result(&intent, &result, &snapshot, 10).unwrap();
        *world.credentials.keys().last().unwrap()
    }

    #[test]
    fn issue_then_revoke() {
        let a = agent_at(1, 0, 0);
        let b = agent_at(2, 1, 0);
        let mut world = world_with(vec![a.clone(), b.clone()]);
        let id = issue(&mut world, &a, &b, "Master builder");

        let again = resolve(
            &world,
            a.id,
            ActionParams::IssueCredential {
                subject: b.id,
                title: "Master builder".to_owned(),
            },
        );
        assert_eq!(
            error_of(&again),
            "An active credential with this title already exists"
        );

        let by_subject = resolve(&world, b.id, ActionParams::RevokeCredential { credential_id: id });
        assert_eq!(error_of(&by_subject), "Only the issuer can revoke this credential");

        let params = ActionParams::RevokeCredential { credential_id: id };
        let snapshot = world.clone();
        let result = resolve(&snapshot, a.id, params.clone());
        let intent = ActionIntent::new(a.id, params.clone(), 1);
        world.apply_result(&intent, &result, &snapshot, 10).unwrap();
        assert_eq!(world.credentials.get(&id).unwrap().revoked_tick, Some(1));

        assert_eq!(
            error_of(&resolve(&world, a.id, params)),
            "Credential was already revoked"
        );
    }

    #[test]
    fn cannot_credential_yourself() {
        let a = agent_at(1, 0, 0);
        let world = world_with(vec![a.clone()]);
        let result = resolve(
            &world,
            a.id,
            ActionParams::IssueCredential {
                subject: a.id,
                title: "Genius".to_owned(),
            },
        );
        assert_eq!(error_of(&result), "Cannot target yourself");
    }
}
