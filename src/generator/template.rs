//! Structured infrastructure plans and their HCL templates.
//!
//! An [`InfraPlan`] is a region, a list of [`ResourceSpec`] values and a
//! set of tags. [`TemplateRenderer`] turns a plan into a complete terraform
//! configuration: the provider header followed by one template per
//! resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::{GenerationError, Result};

/// Default SQS visibility timeout in seconds.
pub const DEFAULT_VISIBILITY_TIMEOUT: u32 = 30;

const FIFO_SUFFIX: &str = ".fifo";

/// A structured infrastructure request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraPlan {
    /// AWS region for the provider block.
    #[serde(default)]
    pub region: String,
    /// Resources to create, in order.
    pub resources: Vec<ResourceSpec>,
    /// Tags applied to every resource through the provider.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// One resource kind the templates know how to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceSpec {
    /// An S3 bucket.
    S3 {
        /// Bucket name, also used as the resource name.
        name: String,
        /// Whether object versioning is enabled.
        #[serde(default)]
        versioning: bool,
        /// Whether server-side encryption is configured.
        #[serde(default)]
        encrypted: bool,
    },
    /// An SQS queue.
    Sqs {
        /// Queue name.
        name: String,
        /// Whether the queue is FIFO.
        #[serde(default)]
        fifo: bool,
        /// Visibility timeout in seconds.
        #[serde(default = "default_visibility_timeout")]
        visibility_timeout: u32,
    },
    /// An ECS cluster running one Fargate service with its own network.
    EcsCluster {
        /// Cluster name.
        cluster_name: String,
        /// Service name, also the prefix of the network resources.
        service_name: String,
        /// Task definition family.
        task_name: String,
        /// Task CPU units.
        #[serde(default = "default_cpu")]
        cpu: u32,
        /// Task memory in MiB.
        #[serde(default = "default_memory")]
        memory: u32,
    },
}

const fn default_visibility_timeout() -> u32 {
    DEFAULT_VISIBILITY_TIMEOUT
}

const fn default_cpu() -> u32 {
    256
}

const fn default_memory() -> u32 {
    512
}

impl InfraPlan {
    /// Creates an empty plan for a region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            resources: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Adds a resource.
    #[must_use]
    pub fn with_resource(mut self, resource: ResourceSpec) -> Self {
        self.resources.push(resource);
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Checks that the plan can be rendered.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is blank, there are no resources, or a
    /// resource has a blank name.
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(GenerationError::invalid("plan has no region").into());
        }
        if self.resources.is_empty() {
            return Err(GenerationError::invalid("plan has no resources").into());
        }
        for resource in &self.resources {
            if resource.names().iter().any(|n| n.trim().is_empty()) {
                return Err(
                    GenerationError::invalid(format!("{} has a blank name", resource.kind())).into(),
                );
            }
        }
        Ok(())
    }
}

impl ResourceSpec {
    /// Human-readable kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "S3 bucket",
            Self::Sqs { .. } => "SQS queue",
            Self::EcsCluster { .. } => "ECS cluster",
        }
    }

    fn names(&self) -> Vec<&str> {
        match self {
            Self::S3 { name, .. } | Self::Sqs { name, .. } => vec![name.as_str()],
            Self::EcsCluster {
                cluster_name,
                service_name,
                task_name,
                ..
            } => vec![cluster_name.as_str(), service_name.as_str(), task_name.as_str()],
        }
    }

    /// One-line description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::S3 {
                name,
                versioning,
                encrypted,
            } => {
                let versioning = if *versioning { "enabled" } else { "suspended" };
                let encryption = if *encrypted { ", encrypted" } else { "" };
                format!("S3 bucket {name} (versioning {versioning}{encryption})")
            }
            Self::Sqs {
                name,
                fifo,
                visibility_timeout,
            } => {
                let kind = if *fifo { "FIFO" } else { "standard" };
                format!(
                    "SQS {kind} queue {} (visibility timeout {visibility_timeout}s)",
                    queue_name(name, *fifo)
                )
            }
            Self::EcsCluster {
                cluster_name,
                service_name,
                task_name,
                cpu,
                memory,
            } => format!(
                "ECS cluster {cluster_name} running Fargate service {service_name} \
                 (task {task_name}, {cpu} CPU units, {memory} MiB) in a dedicated VPC"
            ),
        }
    }
}

/// Renders [`InfraPlan`] values to terraform code.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Creates a renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Renders the full configuration for `plan`.
    #[must_use]
    pub fn render(&self, plan: &InfraPlan) -> String {
        let mut out = header(&plan.region, &plan.tags);
        for resource in &plan.resources {
            out.push('\n');
            out.push_str(&match resource {
                ResourceSpec::S3 {
                    name,
                    versioning,
                    encrypted,
                } => s3(name, *versioning, *encrypted),
                ResourceSpec::Sqs {
                    name,
                    fifo,
                    visibility_timeout,
                } => sqs(name, *fifo, *visibility_timeout),
                ResourceSpec::EcsCluster {
                    cluster_name,
                    service_name,
                    task_name,
                    cpu,
                    memory,
                } => ecs(&plan.region, cluster_name, service_name, task_name, *cpu, *memory),
            });
        }
        out
    }

    /// Describes `plan` with one line per resource.
    #[must_use]
    pub fn describe(&self, plan: &InfraPlan) -> String {
        let mut out = format!(
            "Create {} resource(s) in {}:",
            plan.resources.len(),
            plan.region
        );
        for resource in &plan.resources {
            let _ = write!(out, "\n- {}", resource.describe());
        }
        if !plan.tags.is_empty() {
            let tags: Vec<String> = plan.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
            let _ = write!(out, "\nTags: {}", tags.join(", "));
        }
        out
    }
}

fn header(region: &str, tags: &BTreeMap<String, String>) -> String {
    let mut out = format!(
        r#"terraform {{
  required_providers {{
    aws = {{
      source = "hashicorp/aws"
    }}
  }}
}}

provider "aws" {{
  region = {}
"#,
        quote(region)
    );

    if !tags.is_empty() {
        out.push_str("\n  default_tags {\n    tags = {\n");
        for (key, value) in tags {
            let _ = writeln!(out, "      {} = {}", quote(key), quote(value));
        }
        out.push_str("    }\n  }\n");
    }

    out.push_str("}\n");
    out
}

fn s3(name: &str, versioning: bool, encrypted: bool) -> String {
    let status = if versioning { "Enabled" } else { "Suspended" };
    let mut out = format!(
        r#"resource "aws_s3_bucket" "{name}" {{
  bucket = {bucket}
}}

resource "aws_s3_bucket_versioning" "{name}_v" {{
  bucket = aws_s3_bucket.{name}.id
  versioning_configuration {{
    status = "{status}"
  }}
}}
"#,
        bucket = quote(name),
    );

    if encrypted {
        let _ = write!(
            out,
            r#"
resource "aws_s3_bucket_server_side_encryption_configuration" "{name}_sse" {{
  bucket = aws_s3_bucket.{name}.id
  rule {{
    apply_server_side_encryption_by_default {{
      sse_algorithm = "AES256"
    }}
  }}
}}
"#
        );
    }
    out
}

fn sqs(name: &str, fifo: bool, visibility_timeout: u32) -> String {
    let resource_name = name.trim_end_matches(FIFO_SUFFIX);
    let dedup = if fifo {
        "  content_based_deduplication = true\n"
    } else {
        ""
    };
    format!(
        r#"resource "aws_sqs_queue" "{resource_name}" {{
  name                       = {queue}
  fifo_queue                 = {fifo}
  visibility_timeout_seconds = {visibility_timeout}
{dedup}}}
"#,
        queue = quote(&queue_name(name, fifo)),
    )
}

/// Every block is a `resource`, so the stack survives being appended to an
/// existing workspace file.
fn ecs(region: &str, cluster: &str, service: &str, task: &str, cpu: u32, memory: u32) -> String {
    format!(
        r#"resource "aws_ecs_cluster" "{cluster}" {{
  name = "{cluster}"
}}

resource "aws_ecs_task_definition" "{task}" {{
  family                   = "{task}"
  network_mode             = "awsvpc"
  requires_compatibilities = ["FARGATE"]
  cpu                      = "{cpu}"
  memory                   = "{memory}"
  execution_role_arn       = aws_iam_role.{task}_execution_role.arn

  container_definitions = jsonencode([{{
    name      = "{task}"
    image     = "nginx:latest"
    essential = true
    portMappings = [{{
      containerPort = 80
      protocol      = "tcp"
    }}]
  }}])
}}

resource "aws_iam_role" "{task}_execution_role" {{
  name = "{task}-execution-role"

  assume_role_policy = jsonencode({{
    Version = "2012-10-17"
    Statement = [{{
      Action = "sts:AssumeRole"
      Effect = "Allow"
      Principal = {{
        Service = "ecs-tasks.amazonaws.com"
      }}
    }}]
  }})
}}

resource "aws_iam_role_policy_attachment" "{task}_execution_policy" {{
  role       = aws_iam_role.{task}_execution_role.name
  policy_arn = "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy"
}}

resource "aws_ecs_service" "{service}" {{
  name            = "{service}"
  cluster         = aws_ecs_cluster.{cluster}.id
  task_definition = aws_ecs_task_definition.{task}.arn
  desired_count   = 1
  launch_type     = "FARGATE"

  network_configuration {{
    subnets          = [aws_subnet.{service}_subnet.id]
    security_groups  = [aws_security_group.{service}_sg.id]
    assign_public_ip = true
  }}
}}

resource "aws_vpc" "{service}_vpc" {{
  cidr_block           = "10.0.0.0/16"
  enable_dns_hostnames = true
  enable_dns_support   = true
}}

resource "aws_subnet" "{service}_subnet" {{
  vpc_id                  = aws_vpc.{service}_vpc.id
  cidr_block              = "10.0.1.0/24"
  availability_zone       = {zone}
  map_public_ip_on_launch = true
}}

resource "aws_internet_gateway" "{service}_igw" {{
  vpc_id = aws_vpc.{service}_vpc.id
}}

resource "aws_route_table" "{service}_rt" {{
  vpc_id = aws_vpc.{service}_vpc.id

  route {{
    cidr_block = "0.0.0.0/0"
    gateway_id = aws_internet_gateway.{service}_igw.id
  }}
}}

resource "aws_route_table_association" "{service}_rta" {{
  subnet_id      = aws_subnet.{service}_subnet.id
  route_table_id = aws_route_table.{service}_rt.id
}}

resource "aws_security_group" "{service}_sg" {{
  name        = "{service}-sg"
  description = "Security group for {service}"
  vpc_id      = aws_vpc.{service}_vpc.id

  ingress {{
    from_port   = 80
    to_port     = 80
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }}

  egress {{
    from_port   = 0
    to_port     = 0
    protocol    = "-1"
    cidr_blocks = ["0.0.0.0/0"]
  }}
}}
"#,
        zone = quote(&format!("{region}a")),
    )
}

fn queue_name(name: &str, fifo: bool) -> String {
    if fifo && !name.ends_with(FIFO_SUFFIX) {
        format!("{name}{FIFO_SUFFIX}")
    } else {
        name.to_string()
    }
}

/// HCL string literal.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{extract_resource_blocks, ResourceBlock};

    fn bucket(name: &str, versioning: bool, encrypted: bool) -> ResourceSpec {
        ResourceSpec::S3 {
            name: name.to_string(),
            versioning,
            encrypted,
        }
    }

    #[test]
    fn test_header_has_region() {
        let code = TemplateRenderer::new().render(&InfraPlan::new("sa-east-1"));
        assert!(code.starts_with("terraform {\n  required_providers {"));
        assert!(code.contains("provider \"aws\" {\n  region = \"sa-east-1\"\n}\n"));
        assert!(!code.contains("default_tags"));
    }

    #[test]
    fn test_tags_become_default_tags() {
        let plan = InfraPlan::new("us-east-1")
            .with_tag("Team", "platform")
            .with_tag("Env", "dev");
        let code = TemplateRenderer::new().render(&plan);

        assert!(code.contains(
            "  default_tags {\n    tags = {\n      \"Env\" = \"dev\"\n      \"Team\" = \"platform\"\n    }\n  }\n}\n"
        ));
    }

    #[test]
    fn test_s3_versioning_and_encryption() {
        let plan = InfraPlan::new("us-east-1")
            .with_resource(bucket("logs", true, true))
            .with_resource(bucket("scratch", false, false));
        let code = TemplateRenderer::new().render(&plan);

        assert!(code.contains("resource \"aws_s3_bucket\" \"logs\" {\n  bucket = \"logs\"\n}"));
        assert!(code.contains("resource \"aws_s3_bucket_versioning\" \"logs_v\""));
        assert!(code.contains("status = \"Enabled\""));
        assert!(code.contains("status = \"Suspended\""));
        assert!(code.contains("\"aws_s3_bucket_server_side_encryption_configuration\" \"logs_sse\""));
        assert!(!code.contains("\"scratch_sse\""));
    }

    #[test]
    fn test_fifo_queue_gets_suffix_and_dedup() {
        let plan = InfraPlan::new("us-east-1").with_resource(ResourceSpec::Sqs {
            name: "orders".to_string(),
            fifo: true,
            visibility_timeout: 45,
        });
        let code = TemplateRenderer::new().render(&plan);

        assert!(code.contains("resource \"aws_sqs_queue\" \"orders\""));
        assert!(code.contains("name                       = \"orders.fifo\""));
        assert!(code.contains("fifo_queue                 = true"));
        assert!(code.contains("visibility_timeout_seconds = 45"));
        assert!(code.contains("content_based_deduplication = true"));
    }

    #[test]
    fn test_rendered_resources_are_extractable() {
        let plan = InfraPlan::new("us-east-1")
            .with_resource(bucket("data", true, true))
            .with_resource(ResourceSpec::Sqs {
                name: "jobs".to_string(),
                fifo: false,
                visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            })
            .with_resource(ResourceSpec::EcsCluster {
                cluster_name: "web".to_string(),
                service_name: "api".to_string(),
                task_name: "api-task".to_string(),
                cpu: 256,
                memory: 512,
            });
        let code = TemplateRenderer::new().render(&plan);
        let addresses: Vec<String> = extract_resource_blocks(&code)
            .iter()
            .filter_map(ResourceBlock::address)
            .collect();

        assert_eq!(
            addresses,
            [
                "aws_s3_bucket.data",
                "aws_s3_bucket_versioning.data_v",
                "aws_s3_bucket_server_side_encryption_configuration.data_sse",
                "aws_sqs_queue.jobs",
                "aws_ecs_cluster.web",
                "aws_ecs_task_definition.api-task",
                "aws_iam_role.api-task_execution_role",
                "aws_iam_role_policy_attachment.api-task_execution_policy",
                "aws_ecs_service.api",
                "aws_vpc.api_vpc",
                "aws_subnet.api_subnet",
                "aws_internet_gateway.api_igw",
                "aws_route_table.api_rt",
                "aws_route_table_association.api_rta",
                "aws_security_group.api_sg",
            ]
        );
        assert!(code.contains("availability_zone       = \"us-east-1a\""));
        assert!(!code.contains("data."));
    }

    #[test]
    fn test_plan_deserializes_with_defaults() {
        let json = r#"{
            "region": "us-west-2",
            "resources": [
                {"type": "s3", "name": "assets", "versioning": true},
                {"type": "sqs", "name": "events"},
                {"type": "ecs_cluster", "cluster_name": "c", "service_name": "s", "task_name": "t"}
            ]
        }"#;
        let plan: InfraPlan = serde_json::from_str(json).unwrap();

        assert!(plan.tags.is_empty());
        assert_eq!(plan.resources[0], bucket("assets", true, false));
        assert_eq!(
            plan.resources[1],
            ResourceSpec::Sqs {
                name: "events".to_string(),
                fifo: false,
                visibility_timeout: 30,
            }
        );
        assert!(matches!(
            plan.resources[2],
            ResourceSpec::EcsCluster { cpu: 256, memory: 512, .. }
        ));
    }

    #[test]
    fn test_validate() {
        assert!(InfraPlan::new("us-east-1").validate().is_err());
        assert!(InfraPlan::new(" ").with_resource(bucket("a", false, false)).validate().is_err());
        assert!(InfraPlan::new("us-east-1").with_resource(bucket("", false, false)).validate().is_err());
        assert!(InfraPlan::new("us-east-1").with_resource(bucket("a", false, false)).validate().is_ok());
    }

    #[test]
    fn test_describe() {
        let plan = InfraPlan::new("eu-west-1")
            .with_resource(bucket("demo", true, false))
            .with_tag("Env", "dev");
        assert_eq!(
            TemplateRenderer::new().describe(&plan),
            "Create 1 resource(s) in eu-west-1:\n- S3 bucket demo (versioning enabled)\nTags: Env=dev"
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
