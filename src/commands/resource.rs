//! Resource commands: `kn <kind> create|delete|describe|list`.

use async_trait::async_trait;
use clap::Parser;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{Operation, ResourceKind, ResourceRequest};
use crate::config::mappings::{resolve_channel_type, resolve_sink, SinkRef};
use crate::error::{KnError, Result};

use super::tree::{CommandContext, Runner};
use super::{parse_args, path_of};

const DEFAULT_NAMESPACE: &str = "default";

#[derive(Parser, Debug)]
struct CreateArgs {
    /// Name of the resource
    name: String,

    /// Namespace to create the resource in
    #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Container image (service)
    #[arg(long)]
    image: Option<String>,

    /// Event sink as prefix:name, a bare name is a service (trigger, source)
    #[arg(short, long)]
    sink: Option<String>,

    /// Broker to attach to (trigger)
    #[arg(long, default_value = "default")]
    broker: String,

    /// Channel type alias or group:version:kind (channel)
    #[arg(long = "type")]
    channel_type: Option<String>,

    /// Target of the mapping as prefix:name (domain)
    #[arg(long = "ref")]
    reference: Option<String>,
}

#[derive(Parser, Debug)]
struct NameArgs {
    /// Name of the resource
    name: String,

    #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,
}

#[derive(Parser, Debug)]
struct ListArgs {
    #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// List across all namespaces
    #[arg(short = 'A', long)]
    all_namespaces: bool,
}

/// Leaf runner for one kind and operation.
#[derive(Debug, Clone, Copy)]
pub struct ResourceCommand {
    kind: ResourceKind,
    operation: Operation,
}

impl ResourceCommand {
    pub fn new(kind: ResourceKind, operation: Operation) -> Self {
        Self { kind, operation }
    }

    fn path(&self) -> Vec<String> {
        let verb = match self.operation {
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::Describe => "describe",
        };
        path_of(&[self.group_verb(), verb])
    }

    fn group_verb(&self) -> &'static str {
        match self.kind {
            ResourceKind::Service => "service",
            ResourceKind::Revision => "revision",
            ResourceKind::Route => "route",
            ResourceKind::Trigger => "trigger",
            ResourceKind::Broker => "broker",
            ResourceKind::Channel => "channel",
            ResourceKind::Source => "source",
            ResourceKind::Domain => "domain",
        }
    }

    /// Build the request for this invocation, or `None` when help was shown.
    fn request(
        &self,
        ctx: &mut CommandContext<'_>,
        args: &[String],
    ) -> Result<Option<ResourceRequest>> {
        let path = self.path();
        let request = match self.operation {
            Operation::Create => {
                let Some(parsed) = parse_args::<CreateArgs>(&path, args, ctx.out)? else {
                    return Ok(None);
                };
                let spec = self.create_spec(ctx, &parsed)?;
                ResourceRequest {
                    operation: Operation::Create,
                    kind: self.kind,
                    namespace: parsed.namespace,
                    name: Some(parsed.name),
                    spec,
                }
            }
            Operation::Delete | Operation::Describe => {
                let Some(parsed) = parse_args::<NameArgs>(&path, args, ctx.out)? else {
                    return Ok(None);
                };
                ResourceRequest {
                    operation: self.operation,
                    kind: self.kind,
                    namespace: parsed.namespace,
                    name: Some(parsed.name),
                    spec: Value::Null,
                }
            }
            Operation::List => {
                let Some(parsed) = parse_args::<ListArgs>(&path, args, ctx.out)? else {
                    return Ok(None);
                };
                ResourceRequest {
                    operation: Operation::List,
                    kind: self.kind,
                    namespace: if parsed.all_namespaces {
                        String::new()
                    } else {
                        parsed.namespace
                    },
                    name: None,
                    spec: Value::Null,
                }
            }
        };
        Ok(Some(request))
    }

    fn create_spec(&self, ctx: &CommandContext<'_>, parsed: &CreateArgs) -> Result<Value> {
        self.reject_foreign_flags(parsed)?;
        let sinks = ctx.config.sink_mappings();
        let spec = match self.kind {
            ResourceKind::Service => {
                let image = required(&parsed.image, "image", "service")?;
                json!({ "template": { "containers": [{ "image": image }] } })
            }
            ResourceKind::Trigger => {
                let sink = resolve_sink(required(&parsed.sink, "sink", "trigger")?, &sinks)?;
                json!({ "broker": parsed.broker, "subscriber": { "ref": sink_ref(&sink) } })
            }
            ResourceKind::Source => {
                let sink = resolve_sink(required(&parsed.sink, "sink", "source")?, &sinks)?;
                json!({ "sink": { "ref": sink_ref(&sink) } })
            }
            ResourceKind::Channel => {
                let value = parsed.channel_type.as_deref().unwrap_or("imc");
                let channel = resolve_channel_type(value, &ctx.config.channel_type_mappings())?;
                json!({
                    "channelTemplate": {
                        "apiVersion": format!("{}/{}", channel.group, channel.version),
                        "kind": channel.kind,
                    }
                })
            }
            ResourceKind::Domain => {
                let target = resolve_sink(required(&parsed.reference, "ref", "domain")?, &sinks)?;
                json!({ "ref": sink_ref(&target) })
            }
            ResourceKind::Broker | ResourceKind::Revision | ResourceKind::Route => json!({}),
        };
        debug!(kind = self.kind.plural(), spec = %spec, "Built create spec");
        Ok(spec)
    }

    /// Flags that belong to another kind's `create` are an input error.
    fn reject_foreign_flags(&self, parsed: &CreateArgs) -> Result<()> {
        let allowed: &[&str] = match self.kind {
            ResourceKind::Service => &["image"],
            ResourceKind::Trigger => &["sink"],
            ResourceKind::Source => &["sink"],
            ResourceKind::Channel => &["type"],
            ResourceKind::Domain => &["ref"],
            _ => &[],
        };
        let given = [
            ("image", parsed.image.is_some()),
            ("sink", parsed.sink.is_some()),
            ("type", parsed.channel_type.is_some()),
            ("ref", parsed.reference.is_some()),
        ];
        for (flag, present) in given {
            if present && !allowed.contains(&flag) {
                return Err(KnError::UserInput(format!(
                    "flag '--{}' is not supported by 'kn {} create'",
                    flag,
                    self.group_verb()
                )));
            }
        }
        Ok(())
    }
}

fn required<'a>(value: &'a Option<String>, flag: &str, kind: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| KnError::UserInput(format!("a {} needs '--{}'", kind, flag)))
}

fn sink_ref(sink: &SinkRef) -> Value {
    json!({
        "apiVersion": format!("{}/{}", sink.group, sink.version),
        "resource": sink.resource,
        "name": sink.name,
    })
}

#[async_trait]
impl Runner for ResourceCommand {
    async fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(request) = self.request(ctx, args)? else {
            return Ok(());
        };

        let cancel = ctx.cancel.clone();
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(KnError::Cancelled),
            result = ctx.client.execute(&request) => result?,
        };
        writeln!(ctx.out, "{}", output)?;
        Ok(())
    }
}
