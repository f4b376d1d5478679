//! Sink and channel-type mappings.
//!
//! A mapping is a user-defined alias resolved to a concrete API kind by list
//! lookup. Sink mappings turn `prefix:name` sink references into a resource,
//! channel-type mappings turn `--type <alias>` into a channel kind.
//!
//! List operations are pure: they take the current list and return the new
//! one, so they can be handed to [`Config::mutate_list`](super::Config::mutate_list).

use serde::{Deserialize, Serialize};

use crate::error::{KnError, Result};

/// A sink prefix mapping (`eventing.sink-mappings`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkMapping {
    /// Prefix used on the command line, e.g. `svc` in `svc:mysvc`.
    pub prefix: String,
    /// Plural resource name, e.g. `services`.
    pub resource: String,
    /// API group, e.g. `serving.knative.dev`.
    pub group: String,
    /// API version, e.g. `v1`.
    pub version: String,
}

/// A channel type alias (`eventing.channel-type-mappings`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTypeMapping {
    /// Alias used with `--type`.
    pub alias: String,
    /// Kind, e.g. `KafkaChannel`.
    pub kind: String,
    /// API group, e.g. `messaging.knative.dev`.
    pub group: String,
    /// API version, e.g. `v1alpha1`.
    pub version: String,
}

/// Common view over mapping entries: each is identified by a unique alias.
pub trait Mapping: Clone {
    /// The alias (or prefix) identifying this entry within its list.
    fn alias(&self) -> &str;
}

impl Mapping for SinkMapping {
    fn alias(&self) -> &str {
        &self.prefix
    }
}

impl Mapping for ChannelTypeMapping {
    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Append `entry`, failing with `AliasExists` if its alias is taken.
pub fn add<M: Mapping>(list: Vec<M>, entry: M) -> Result<Vec<M>> {
    if list.iter().any(|m| m.alias() == entry.alias()) {
        return Err(KnError::AliasExists(entry.alias().to_string()));
    }
    let mut out = list;
    out.push(entry);
    Ok(out)
}

/// Replace the entry with the same alias in place, failing with
/// `AliasNotFound` if there is none.
pub fn update<M: Mapping>(list: Vec<M>, entry: M) -> Result<Vec<M>> {
    let mut out = list;
    match out.iter_mut().find(|m| m.alias() == entry.alias()) {
        Some(slot) => {
            *slot = entry;
            Ok(out)
        }
        None => Err(KnError::AliasNotFound(entry.alias().to_string())),
    }
}

/// Remove every entry with the given alias. Unknown aliases are ignored.
pub fn delete<M: Mapping>(list: Vec<M>, alias: &str) -> Vec<M> {
    list.into_iter().filter(|m| m.alias() != alias).collect()
}

/// Find the entry with the given alias.
pub fn find<'a, M: Mapping>(list: &'a [M], alias: &str) -> Option<&'a M> {
    list.iter().find(|m| m.alias() == alias)
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// A sink reference resolved to a concrete resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkRef {
    pub group: String,
    pub version: String,
    pub resource: String,
    pub name: String,
}

/// A channel type resolved to a concrete kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelType {
    pub group: String,
    pub version: String,
    pub kind: String,
}

fn builtin_sink_mappings() -> Vec<SinkMapping> {
    vec![
        SinkMapping {
            prefix: "ksvc".to_string(),
            resource: "services".to_string(),
            group: "serving.knative.dev".to_string(),
            version: "v1".to_string(),
        },
        SinkMapping {
            prefix: "broker".to_string(),
            resource: "brokers".to_string(),
            group: "eventing.knative.dev".to_string(),
            version: "v1".to_string(),
        },
        SinkMapping {
            prefix: "channel".to_string(),
            resource: "channels".to_string(),
            group: "messaging.knative.dev".to_string(),
            version: "v1".to_string(),
        },
    ]
}

fn builtin_channel_types() -> Vec<ChannelTypeMapping> {
    vec![ChannelTypeMapping {
        alias: "imc".to_string(),
        kind: "InMemoryChannel".to_string(),
        group: "messaging.knative.dev".to_string(),
        version: "v1".to_string(),
    }]
}

/// Resolve a `prefix:name` sink reference. A bare name refers to a service.
///
/// User mappings take precedence over the built-in `ksvc`, `broker` and
/// `channel` prefixes.
pub fn resolve_sink(reference: &str, user: &[SinkMapping]) -> Result<SinkRef> {
    let (prefix, name) = match reference.split_once(':') {
        Some((p, n)) => (p, n),
        None => ("ksvc", reference),
    };
    if name.is_empty() {
        return Err(KnError::UserInput(format!(
            "sink '{}' does not name a resource",
            reference
        )));
    }

    let builtin = builtin_sink_mappings();
    let mapping = find(user, prefix)
        .or_else(|| find(&builtin, prefix))
        .ok_or_else(|| {
            let mut known: Vec<&str> = user
                .iter()
                .chain(builtin.iter())
                .map(|m| m.prefix.as_str())
                .collect();
            known.sort_unstable();
            known.dedup();
            KnError::UserInput(format!(
                "unsupported sink prefix '{}', use one of: {}",
                prefix,
                known.join(", ")
            ))
        })?;

    Ok(SinkRef {
        group: mapping.group.clone(),
        version: mapping.version.clone(),
        resource: mapping.resource.clone(),
        name: name.to_string(),
    })
}

/// Resolve a channel `--type` value.
///
/// Accepts an alias (user mappings first, then the built-in `imc`) or a
/// literal `group:version:kind` triple.
pub fn resolve_channel_type(value: &str, user: &[ChannelTypeMapping]) -> Result<ChannelType> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() == 3 && parts.iter().all(|p| !p.is_empty()) {
        return Ok(ChannelType {
            group: parts[0].to_string(),
            version: parts[1].to_string(),
            kind: parts[2].to_string(),
        });
    }

    let builtin = builtin_channel_types();
    find(user, value)
        .or_else(|| find(&builtin, value))
        .map(|m| ChannelType {
            group: m.group.clone(),
            version: m.version.clone(),
            kind: m.kind.clone(),
        })
        .ok_or_else(|| {
            KnError::UserInput(format!(
                "invalid channel type alias '{}', expected a configured alias or group:version:kind",
                value
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kafka() -> ChannelTypeMapping {
        ChannelTypeMapping {
            alias: "Kafka".to_string(),
            kind: "KafkaChannel".to_string(),
            group: "messaging.knative.dev".to_string(),
            version: "v1alpha1".to_string(),
        }
    }

    fn rabbit() -> ChannelTypeMapping {
        ChannelTypeMapping {
            alias: "RabbitMQ".to_string(),
            kind: "RabbitmqChannel".to_string(),
            group: "messaging.knative.dev".to_string(),
            version: "v1beta1".to_string(),
        }
    }

    #[test]
    fn test_add_then_delete_is_identity() {
        let initial = vec![kafka()];
        let added = add(initial.clone(), rabbit()).unwrap();
        assert_eq!(added.len(), 2);
        let removed = delete(added, "RabbitMQ");
        assert_eq!(removed, initial);
    }

    #[test]
    fn test_add_existing_alias_fails() {
        let err = add(vec![kafka()], kafka()).unwrap_err();
        assert!(matches!(err, KnError::AliasExists(ref a) if a == "Kafka"));
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let list = add(vec![rabbit()], kafka()).unwrap();
        let aliases: Vec<&str> = list.iter().map(|m| m.alias()).collect();
        assert_eq!(aliases, vec!["RabbitMQ", "Kafka"]);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut changed = kafka();
        changed.version = "v1beta1".to_string();
        let list = update(vec![kafka(), rabbit()], changed.clone()).unwrap();
        assert_eq!(list[0], changed);
        assert_eq!(list[1], rabbit());
    }

    #[test]
    fn test_update_unknown_alias_fails() {
        let err = update(vec![kafka()], rabbit()).unwrap_err();
        assert!(matches!(err, KnError::AliasNotFound(ref a) if a == "RabbitMQ"));
    }

    #[test]
    fn test_delete_unknown_alias_is_noop() {
        let list = delete(vec![kafka()], "Nats");
        assert_eq!(list, vec![kafka()]);
    }

    #[test]
    fn test_resolve_sink_bare_name_is_service() {
        let sink = resolve_sink("mysvc", &[]).unwrap();
        assert_eq!(sink.resource, "services");
        assert_eq!(sink.group, "serving.knative.dev");
        assert_eq!(sink.name, "mysvc");
    }

    #[test]
    fn test_resolve_sink_user_mapping_wins() {
        let user = vec![SinkMapping {
            prefix: "broker".to_string(),
            resource: "kafkabrokers".to_string(),
            group: "eventing.example.dev".to_string(),
            version: "v1alpha1".to_string(),
        }];
        let sink = resolve_sink("broker:default", &user).unwrap();
        assert_eq!(sink.resource, "kafkabrokers");
        assert_eq!(sink.version, "v1alpha1");
    }

    #[test]
    fn test_resolve_sink_unknown_prefix() {
        let err = resolve_sink("nope:thing", &[]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unsupported sink prefix 'nope'"));
        assert!(msg.contains("broker, channel, ksvc"));
    }

    #[test]
    fn test_resolve_sink_empty_name() {
        assert!(resolve_sink("ksvc:", &[]).is_err());
    }

    #[test]
    fn test_resolve_channel_type_alias_and_literal() {
        let user = vec![kafka()];
        let ct = resolve_channel_type("Kafka", &user).unwrap();
        assert_eq!(ct.kind, "KafkaChannel");

        let imc = resolve_channel_type("imc", &user).unwrap();
        assert_eq!(imc.kind, "InMemoryChannel");

        let literal = resolve_channel_type("messaging.example.dev:v1:NatsChannel", &[]).unwrap();
        assert_eq!(literal.group, "messaging.example.dev");
        assert_eq!(literal.kind, "NatsChannel");
    }

    #[test]
    fn test_resolve_channel_type_invalid_alias() {
        let err = resolve_channel_type("Nats", &[]).unwrap_err();
        assert!(err.to_string().contains("invalid channel type alias 'Nats'"));
    }
}
