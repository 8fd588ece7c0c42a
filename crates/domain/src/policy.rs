use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One role-to-members pair inside a policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBinding {
    /// Granted role.
    pub role: String,
    /// Principals holding the role.
    #[serde(default)]
    pub members: Vec<String>,
    /// Optional condition expression; conditional bindings are never merged into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl PolicyBinding {
    /// Returns true when the binding is unconditional and grants `role`.
    #[must_use]
    pub fn grants_unconditionally(&self, role: &str) -> bool {
        self.condition.is_none() && self.role == role
    }
}

/// Resource policy replaced as a whole on every write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    /// Policy format version.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: i32,
    /// Ordered bindings.
    #[serde(default)]
    pub bindings: Vec<PolicyBinding>,
    /// Provider concurrency token, echoed back unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Fields not interpreted here, such as audit configs.
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// Effect of granting a role to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingChange {
    /// The principal already holds the role; the document is untouched.
    AlreadyGranted,
    /// The principal was appended to an existing binding.
    AddedToBinding,
    /// A new binding was appended for the role.
    NewBinding,
}

impl BindingChange {
    /// Returns true when the document was mutated.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::AlreadyGranted)
    }
}

impl PolicyDocument {
    /// Grants `role` to `principal`, reusing the first unconditional binding for the role.
    pub fn grant(&mut self, role: &str, principal: &str) -> BindingChange {
        match self
            .bindings
            .iter_mut()
            .find(|binding| binding.grants_unconditionally(role))
        {
            Some(binding) if binding.members.iter().any(|member| member == principal) => {
                BindingChange::AlreadyGranted
            }
            Some(binding) => {
                binding.members.push(principal.to_owned());
                BindingChange::AddedToBinding
            }
            None => {
                self.bindings.push(PolicyBinding {
                    role: role.to_owned(),
                    members: vec![principal.to_owned()],
                    condition: None,
                });
                BindingChange::NewBinding
            }
        }
    }

    /// Returns true when an unconditional binding grants `role` to `principal`.
    #[must_use]
    pub fn has_member(&self, role: &str, principal: &str) -> bool {
        self.bindings
            .iter()
            .filter(|binding| binding.grants_unconditionally(role))
            .any(|binding| binding.members.iter().any(|member| member == principal))
    }
}
