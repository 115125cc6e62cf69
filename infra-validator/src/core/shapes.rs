//! Permissive response shapes for the `aws` and `kubectl` JSON we consume.
//!
//! Every field is optional or defaulted: absent data reads as "not found", while
//! a field of the wrong type fails decoding and surfaces as a
//! [`ShapeError`](crate::core::parse::ShapeError).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Destination CIDR that identifies a default route.
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";
/// Prefix of internet gateway identifiers.
pub const INTERNET_GATEWAY_PREFIX: &str = "igw-";
/// Status reported by EKS clusters and node groups that are serving.
pub const ACTIVE_STATUS: &str = "ACTIVE";

/// Read an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// EC2 (PascalCase)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct VpcList {
    #[serde(deserialize_with = "null_as_default")]
    pub vpcs: Vec<Vpc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Vpc {
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct InternetGatewayList {
    #[serde(deserialize_with = "null_as_default")]
    pub internet_gateways: Vec<InternetGateway>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct InternetGateway {
    pub internet_gateway_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SubnetList {
    #[serde(deserialize_with = "null_as_default")]
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Subnet {
    pub subnet_id: Option<String>,
    pub availability_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RouteTableList {
    #[serde(deserialize_with = "null_as_default")]
    pub route_tables: Vec<RouteTable>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RouteTable {
    pub route_table_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Route {
    pub destination_cidr_block: Option<String>,
    pub gateway_id: Option<String>,
}

impl Route {
    /// True only for `0.0.0.0/0` pointing at an internet gateway.
    pub fn is_default_to_internet_gateway(&self) -> bool {
        self.destination_cidr_block.as_deref() == Some(DEFAULT_ROUTE_CIDR)
            && self
                .gateway_id
                .as_deref()
                .is_some_and(|id| id.starts_with(INTERNET_GATEWAY_PREFIX))
    }
}

impl RouteTableList {
    pub fn has_default_route_to_internet_gateway(&self) -> bool {
        self.route_tables
            .iter()
            .flat_map(|table| &table.routes)
            .any(Route::is_default_to_internet_gateway)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct InstanceReservations {
    #[serde(deserialize_with = "null_as_default")]
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Reservation {
    #[serde(deserialize_with = "null_as_default")]
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Instance {
    pub instance_id: Option<String>,
    pub instance_type: Option<String>,
    pub placement: Option<Placement>,
    pub state: Option<InstanceState>,
    pub public_ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Placement {
    pub availability_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct InstanceState {
    pub name: Option<String>,
}

/// Inventory line recorded for each instance owned by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSummary {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Type")]
    pub instance_type: Option<String>,
    #[serde(rename = "AZ")]
    pub availability_zone: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "PublicIp")]
    pub public_ip: Option<String>,
}

impl InstanceReservations {
    pub fn summaries(&self) -> Vec<InstanceSummary> {
        self.reservations
            .iter()
            .flat_map(|reservation| &reservation.instances)
            .map(|instance| InstanceSummary {
                id: instance.instance_id.clone(),
                instance_type: instance.instance_type.clone(),
                availability_zone: instance
                    .placement
                    .as_ref()
                    .and_then(|p| p.availability_zone.clone()),
                state: instance.state.as_ref().and_then(|s| s.name.clone()),
                public_ip: instance.public_ip_address.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// EKS (camelCase)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterDescription {
    pub cluster: Option<Cluster>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Cluster {
    pub name: Option<String>,
    pub status: Option<String>,
}

impl ClusterDescription {
    pub fn is_active(&self) -> bool {
        self.cluster
            .as_ref()
            .and_then(|c| c.status.as_deref())
            .is_some_and(|status| status == ACTIVE_STATUS)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessEntryList {
    #[serde(deserialize_with = "null_as_default")]
    pub access_entries: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodegroupList {
    #[serde(deserialize_with = "null_as_default")]
    pub nodegroups: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodegroupDescription {
    pub nodegroup: Option<Nodegroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Nodegroup {
    pub nodegroup_name: Option<String>,
    pub status: Option<String>,
    pub health: Option<NodegroupHealth>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodegroupHealth {
    /// Issue objects are kept opaque; they are recorded, never interpreted.
    #[serde(deserialize_with = "null_as_default")]
    pub issues: Vec<Value>,
}

impl NodegroupDescription {
    pub fn status(&self) -> Option<&str> {
        self.nodegroup.as_ref()?.status.as_deref()
    }

    pub fn issues(&self) -> &[Value] {
        self.nodegroup
            .as_ref()
            .and_then(|ng| ng.health.as_ref())
            .map(|health| health.issues.as_slice())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// IAM (PascalCase)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OidcProviderList {
    #[serde(rename = "OpenIDConnectProviderList")]
    #[serde(deserialize_with = "null_as_default")]
    pub providers: Vec<OidcProvider>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OidcProvider {
    pub arn: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RoleLookup {
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Role {
    pub role_name: Option<String>,
    pub arn: Option<String>,
}

impl RoleLookup {
    pub fn has_name(&self, name: &str) -> bool {
        self.role
            .as_ref()
            .and_then(|role| role.role_name.as_deref())
            == Some(name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PolicyList {
    #[serde(deserialize_with = "null_as_default")]
    pub policies: Vec<Policy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Policy {
    pub policy_name: Option<String>,
    pub arn: Option<String>,
}

impl PolicyList {
    pub fn contains(&self, name: &str) -> bool {
        self.policies
            .iter()
            .any(|policy| policy.policy_name.as_deref() == Some(name))
    }
}

// ---------------------------------------------------------------------------
// kubectl (camelCase)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeList {
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<Node>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Node {
    #[serde(deserialize_with = "null_as_default")]
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeStatus {
    #[serde(deserialize_with = "null_as_default")]
    pub conditions: Vec<NodeCondition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeCondition {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
}

impl NodeCondition {
    pub fn is_ready(&self) -> bool {
        self.kind.as_deref() == Some("Ready") && self.status.as_deref() == Some("True")
    }
}

impl NodeList {
    pub fn any_ready(&self) -> bool {
        self.items
            .iter()
            .flat_map(|node| &node.status.conditions)
            .any(NodeCondition::is_ready)
    }
}

/// `kubectl get --raw=/healthz` prints `ok` when the API server is healthy.
pub fn healthz_reports_ok(stdout: &str) -> bool {
    stdout.to_lowercase().contains("ok")
}
