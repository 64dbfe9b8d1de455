//! Ordered parameter lookup over prioritized sources

use crate::models::{Action, Execution, FLOW_ID_PARAM, PAYLOAD_ID_PARAM};
use std::collections::HashMap;

/// Where a resolved parameter value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamOrigin {
    /// Argument table of the request
    Args,
    /// Parameters declared on the action
    ActionParams,
    /// Identifiers inherited from the execution
    ExecutionDefaults,
}

/// Resolved parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParam<'a> {
    pub value: &'a str,
    pub origin: ParamOrigin,
}

/// Prioritized parameter sources, highest priority first.
///
/// Blank values are treated as absent and fall through to the next source.
#[derive(Debug, Default)]
pub struct ParamSources<'a> {
    sources: Vec<(ParamOrigin, HashMap<&'a str, &'a str>)>,
}

impl<'a> ParamSources<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source below every source already registered
    pub fn push<I>(mut self, origin: ParamOrigin, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map = HashMap::new();
        for (key, value) in entries {
            // Later duplicates within one source win, as in a map insert
            map.insert(key, value);
        }
        self.sources.push((origin, map));
        self
    }

    /// Build the sources of an execute request: args, then action params,
    /// then execution defaults when the action declares no params at all
    pub fn for_request(
        args: &'a HashMap<String, String>,
        action: &'a Action,
        execution: &'a Execution,
    ) -> Self {
        let sources = Self::new().push(
            ParamOrigin::Args,
            args.iter().map(|(key, value)| (key.as_str(), value.as_str())),
        );

        if action.has_declared_params() {
            sources.push(
                ParamOrigin::ActionParams,
                action
                    .params
                    .iter()
                    .flatten()
                    .map(|param| (param.key.as_str(), param.value.as_str())),
            )
        } else {
            sources.push(
                ParamOrigin::ExecutionDefaults,
                [
                    (FLOW_ID_PARAM, execution.flow_id.as_str()),
                    (PAYLOAD_ID_PARAM, execution.payload_id.as_str()),
                ],
            )
        }
    }

    /// First non-blank value for `key`, with the source it came from
    pub fn resolve(&self, key: &str) -> Option<ResolvedParam<'a>> {
        self.sources.iter().find_map(|(origin, map)| {
            map.get(key)
                .copied()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| ResolvedParam {
                    value,
                    origin: *origin,
                })
        })
    }

    /// First non-blank value for `key`
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.resolve(key).map(|param| param.value)
    }

    /// Boolean flag; absent or unrecognized values are `false`
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(parse_flag)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
