//! Mutations: serializable structural state beyond inputs and fields.
//!
//! A mutation round-trips through [`MutationForm`], a generic
//! attribute-map/child-element snapshot, so copy/paste, undo logs, and
//! cross-session persistence see the same shape. Change detection compares
//! the canonical text of two forms, never the in-memory values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{error::ModelError, registry::InputSpec};

/// One parameter of a procedure signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: String,
    pub name: String,
    /// Default argument text; `"false"` marks a boolean slot.
    pub default: String,
}

/// Structural state attached to specific block kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Branch count of a conditional block. Branch `1` is the base
    /// `CONDITION`/`SUBSTACK` pair; each further branch adds a
    /// `SUBSTACK{n}` statement input.
    Branches { count: u32 },
    /// A procedure signature shared by the definition's prototype and every
    /// call site.
    Procedure {
        proccode: String,
        params: Vec<Param>,
        warp: bool,
    },
}

/// The generic serialized shape of a mutation: a named node with string
/// attributes and child nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationForm {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MutationForm>,
}

impl MutationForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: MutationForm) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Deterministic textual rendering used for change detection.
    ///
    /// Attribute order is fixed by the sorted map, so two equal forms always
    /// render to the same text.
    pub fn canonical_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Mutation {
    /// Produces the structured snapshot sufficient to reconstruct this
    /// mutation.
    pub fn to_form(&self) -> MutationForm {
        match self {
            Mutation::Branches { count } => {
                MutationForm::new("mutation").with_attribute("branches", count.to_string())
            }
            Mutation::Procedure {
                proccode,
                params,
                warp,
            } => {
                let mut form = MutationForm::new("mutation")
                    .with_attribute("proccode", proccode.clone())
                    .with_attribute("warp", warp.to_string());
                for param in params {
                    form = form.with_child(
                        MutationForm::new("arg")
                            .with_attribute("id", param.id.clone())
                            .with_attribute("name", param.name.clone())
                            .with_attribute("default", param.default.clone()),
                    );
                }
                form
            }
        }
    }

    /// Reconstructs a mutation from its serialized form.
    ///
    /// Malformed forms are hard parse failures; persistence content is
    /// expected to be pre-validated by the surrounding editor.
    pub fn from_form(form: &MutationForm) -> Result<Mutation, ModelError> {
        if let Some(branches) = form.attribute("branches") {
            let count: u32 = branches
                .parse()
                .map_err(|_| ModelError::MalformedMutation(format!("bad branch count '{branches}'")))?;
            if count == 0 {
                return Err(ModelError::MalformedMutation(
                    "branch count must be at least 1".to_string(),
                ));
            }
            return Ok(Mutation::Branches { count });
        }

        if let Some(proccode) = form.attribute("proccode") {
            let warp = match form.attribute("warp") {
                None | Some("false") => false,
                Some("true") => true,
                Some(other) => {
                    return Err(ModelError::MalformedMutation(format!(
                        "bad warp flag '{other}'"
                    )));
                }
            };
            let mut params = Vec::with_capacity(form.children.len());
            for child in &form.children {
                let id = child.attribute("id").ok_or_else(|| {
                    ModelError::MalformedMutation("procedure arg without id".to_string())
                })?;
                let name = child.attribute("name").ok_or_else(|| {
                    ModelError::MalformedMutation("procedure arg without name".to_string())
                })?;
                params.push(Param {
                    id: id.to_string(),
                    name: name.to_string(),
                    default: child.attribute("default").unwrap_or_default().to_string(),
                });
            }
            return Ok(Mutation::Procedure {
                proccode: proccode.to_string(),
                params,
                warp,
            });
        }

        Err(ModelError::MalformedMutation(
            "unrecognized mutation attributes".to_string(),
        ))
    }

    /// The input list this mutation requires, derived from the block kind's
    /// base inputs. Input names are stable across resizes so that attached
    /// children survive unrelated changes.
    pub fn build_inputs(&self, base: &[InputSpec]) -> Vec<InputSpec> {
        match self {
            Mutation::Branches { count } => {
                let mut specs = base.to_vec();
                for branch in 2..=*count {
                    specs.push(InputSpec::statement(format!("SUBSTACK{branch}")));
                }
                specs
            }
            Mutation::Procedure { proccode, params, .. } => {
                let mut specs = vec![InputSpec::label_row("LABEL", proccode.clone())];
                for param in params {
                    if param.default == "false" {
                        specs.push(
                            InputSpec::value(param.id.clone()).with_check(vec!["Boolean".into()]),
                        );
                    } else {
                        specs.push(
                            InputSpec::value(param.id.clone())
                                .with_text_shadow(param.default.clone()),
                        );
                    }
                }
                specs
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branches_form_round_trip() {
        let mutation = Mutation::Branches { count: 3 };
        let form = mutation.to_form();
        assert_eq!(form.attribute("branches"), Some("3"));
        assert_eq!(Mutation::from_form(&form).unwrap(), mutation);
    }

    #[test]
    fn test_procedure_form_round_trip() {
        let mutation = Mutation::Procedure {
            proccode: "jump %s times".to_string(),
            params: vec![Param {
                id: "arg0".to_string(),
                name: "times".to_string(),
                default: "10".to_string(),
            }],
            warp: true,
        };
        let form = mutation.to_form();
        assert_eq!(form.attribute("proccode"), Some("jump %s times"));
        assert_eq!(form.children.len(), 1);
        assert_eq!(Mutation::from_form(&form).unwrap(), mutation);
    }

    #[test]
    fn test_malformed_forms_are_hard_failures() {
        let empty = MutationForm::new("mutation");
        assert!(matches!(
            Mutation::from_form(&empty),
            Err(ModelError::MalformedMutation(_))
        ));

        let bad_count = MutationForm::new("mutation").with_attribute("branches", "many");
        assert!(matches!(
            Mutation::from_form(&bad_count),
            Err(ModelError::MalformedMutation(_))
        ));

        let zero = MutationForm::new("mutation").with_attribute("branches", "0");
        assert!(matches!(
            Mutation::from_form(&zero),
            Err(ModelError::MalformedMutation(_))
        ));

        let arg_without_id = MutationForm::new("mutation")
            .with_attribute("proccode", "p")
            .with_child(MutationForm::new("arg").with_attribute("name", "x"));
        assert!(matches!(
            Mutation::from_form(&arg_without_id),
            Err(ModelError::MalformedMutation(_))
        ));
    }

    #[test]
    fn test_canonical_text_is_deterministic() {
        let a = MutationForm::new("mutation")
            .with_attribute("proccode", "p")
            .with_attribute("warp", "false");
        let b = MutationForm::new("mutation")
            .with_attribute("warp", "false")
            .with_attribute("proccode", "p");
        assert_eq!(a.canonical_text(), b.canonical_text());
    }

    #[test]
    fn test_branch_inputs_extend_the_base_list() {
        let base = vec![
            InputSpec::value("CONDITION").with_check(vec!["Boolean".into()]),
            InputSpec::statement("SUBSTACK"),
        ];
        let specs = Mutation::Branches { count: 2 }.build_inputs(&base);
        let names: Vec<&str> = specs.iter().map(InputSpec::name).collect();
        assert_eq!(names, vec!["CONDITION", "SUBSTACK", "SUBSTACK2"]);
    }
}
