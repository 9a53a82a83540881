//! Role and ownership rules applied at every mutating entry point.
//!
//! Rules are declared once in [`STANDARD_RULES`] as (resource, operation) pairs mapped to a
//! [`Requirement`]. Anything not listed is denied.

use std::fmt;
use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Header carrying the authenticated actor's identity, set by the upstream auth layer.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the authenticated actor's role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Identity of an authenticated actor as resolved by the upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Faculty,
    Student,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Faculty => "faculty",
            Role::Student => "student",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "administrator" | "admin" => Ok(Role::Administrator),
            "faculty" | "teacher" => Ok(Role::Faculty),
            "student" => Ok(Role::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

/// The acting identity passed explicitly into every core operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: ActorId(id.into()),
            role,
        }
    }

    pub fn administrator(id: impl Into<String>) -> Self {
        Self::new(id, Role::Administrator)
    }

    pub fn faculty(id: impl Into<String>) -> Self {
        Self::new(id, Role::Faculty)
    }

    pub fn student(id: impl Into<String>) -> Self {
        Self::new(id, Role::Student)
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let unauthenticated = |message: String| {
            let payload = json!({
                "error": { "kind": "unauthenticated", "message": message },
            });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        };

        let id = header(ACTOR_ID_HEADER)
            .ok_or_else(|| unauthenticated(format!("missing {ACTOR_ID_HEADER} header")))?;
        let role = header(ACTOR_ROLE_HEADER)
            .ok_or_else(|| unauthenticated(format!("missing {ACTOR_ROLE_HEADER} header")))?
            .parse::<Role>()
            .map_err(|err| unauthenticated(err.to_string()))?;

        Ok(Actor::new(id, role))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Curriculum,
    Module,
    Cohort,
    Enrollment,
    Assessment,
    Submission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Decide,
    Complete,
    Review,
    Grade,
}

/// What an actor needs in order to perform an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any of the listed roles, no ownership check.
    Roles(&'static [Role]),
    /// Owner of the entity or of its nearest owning ancestor. Administrators always pass.
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub resource: Resource,
    pub operation: Operation,
    pub requirement: Requirement,
}

const fn rule(resource: Resource, operation: Operation, requirement: Requirement) -> Rule {
    Rule {
        resource,
        operation,
        requirement,
    }
}

const STAFF: &[Role] = &[Role::Administrator, Role::Faculty];
const STUDENT: &[Role] = &[Role::Student];

pub const STANDARD_RULES: &[Rule] = &[
    rule(Resource::Curriculum, Operation::Create, Requirement::Roles(STAFF)),
    rule(Resource::Module, Operation::Create, Requirement::Owner),
    rule(Resource::Module, Operation::Delete, Requirement::Owner),
    rule(Resource::Cohort, Operation::Create, Requirement::Owner),
    rule(Resource::Cohort, Operation::Update, Requirement::Owner),
    rule(Resource::Cohort, Operation::Delete, Requirement::Owner),
    rule(Resource::Enrollment, Operation::Create, Requirement::Roles(STUDENT)),
    rule(Resource::Enrollment, Operation::Review, Requirement::Roles(STAFF)),
    rule(Resource::Enrollment, Operation::Decide, Requirement::Owner),
    rule(Resource::Enrollment, Operation::Complete, Requirement::Owner),
    rule(Resource::Assessment, Operation::Create, Requirement::Roles(STAFF)),
    rule(Resource::Assessment, Operation::Update, Requirement::Owner),
    rule(Resource::Assessment, Operation::Delete, Requirement::Owner),
    rule(Resource::Submission, Operation::Create, Requirement::Roles(STUDENT)),
    rule(Resource::Submission, Operation::Review, Requirement::Roles(STAFF)),
    rule(Resource::Submission, Operation::Grade, Requirement::Owner),
];

/// Raised when an actor lacks the role or ownership an operation requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{role} '{actor}' may not {operation:?} {resource:?}")]
pub struct AccessDenied {
    pub actor: ActorId,
    pub role: &'static str,
    pub resource: Resource,
    pub operation: Operation,
}

/// Table-driven authorization check.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: &'static [Rule],
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl AccessPolicy {
    pub const fn standard() -> Self {
        Self {
            rules: STANDARD_RULES,
        }
    }

    pub fn requirement(&self, resource: Resource, operation: Operation) -> Option<Requirement> {
        self.rules
            .iter()
            .find(|rule| rule.resource == resource && rule.operation == operation)
            .map(|rule| rule.requirement)
    }

    /// Check `actor` against the rule for `(resource, operation)`.
    ///
    /// `owner` is the owning faculty of the entity (or its nearest owning ancestor) and is
    /// only consulted for [`Requirement::Owner`] rules. A missing owner never matches.
    pub fn authorize(
        &self,
        actor: &Actor,
        resource: Resource,
        operation: Operation,
        owner: Option<&ActorId>,
    ) -> Result<(), AccessDenied> {
        let allowed = match self.requirement(resource, operation) {
            Some(Requirement::Roles(roles)) => roles.contains(&actor.role),
            Some(Requirement::Owner) => {
                actor.is_administrator()
                    || (actor.role == Role::Faculty && owner == Some(&actor.id))
            }
            None => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(AccessDenied {
                actor: actor.id.clone(),
                role: actor.role.label(),
                resource,
                operation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> ActorId {
        ActorId::from("f-1")
    }

    #[test]
    fn owner_rules_admit_owning_faculty_and_administrators_only() {
        let policy = AccessPolicy::standard();

        assert!(policy
            .authorize(&Actor::faculty("f-1"), Resource::Cohort, Operation::Create, Some(&owner()))
            .is_ok());
        assert!(policy
            .authorize(&Actor::administrator("root"), Resource::Cohort, Operation::Update, Some(&owner()))
            .is_ok());
        assert!(policy
            .authorize(&Actor::faculty("f-2"), Resource::Cohort, Operation::Update, Some(&owner()))
            .is_err());
        assert!(policy
            .authorize(&Actor::student("f-1"), Resource::Enrollment, Operation::Decide, Some(&owner()))
            .is_err(), "a student sharing the owner id is still not faculty");
    }

    #[test]
    fn missing_owner_fails_closed() {
        let policy = AccessPolicy::standard();
        let denied = policy
            .authorize(&Actor::faculty("f-1"), Resource::Submission, Operation::Grade, None)
            .expect_err("no owner resolved");
        assert_eq!(denied.operation, Operation::Grade);
    }

    #[test]
    fn role_rules_list_permitted_roles_explicitly() {
        let policy = AccessPolicy::standard();

        assert!(policy
            .authorize(&Actor::student("s-1"), Resource::Enrollment, Operation::Create, None)
            .is_ok());
        assert!(policy
            .authorize(&Actor::administrator("root"), Resource::Enrollment, Operation::Create, None)
            .is_err());
        assert!(policy
            .authorize(&Actor::faculty("f-1"), Resource::Assessment, Operation::Create, None)
            .is_ok());
        assert!(policy
            .authorize(&Actor::student("s-1"), Resource::Assessment, Operation::Create, None)
            .is_err());
    }

    #[test]
    fn unlisted_pairs_are_denied() {
        let policy = AccessPolicy::standard();
        assert_eq!(policy.requirement(Resource::Curriculum, Operation::Grade), None);
        assert!(policy
            .authorize(&Actor::administrator("root"), Resource::Curriculum, Operation::Grade, None)
            .is_err());
    }

    #[test]
    fn roles_parse_from_header_values() {
        assert_eq!("Faculty".parse::<Role>().ok(), Some(Role::Faculty));
        assert_eq!(" admin ".parse::<Role>().ok(), Some(Role::Administrator));
        assert!("janitor".parse::<Role>().is_err());
    }
}
