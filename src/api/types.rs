use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Virtual cluster lifecycle states reported by the control plane.
pub mod virtual_cluster_state {
    pub const RUNNING: &str = "RUNNING";
    pub const TERMINATING: &str = "TERMINATING";
    pub const TERMINATED: &str = "TERMINATED";
    pub const ARRESTED: &str = "ARRESTED";
}

/// Container provider types accepted by the control plane.
pub const CONTAINER_PROVIDER_TYPE_VALUES: &[&str] = &["EKS"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EksInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eks_info: Option<EksInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProvider {
    pub id: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<ContainerInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualCluster {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub container_provider: Option<ContainerProvider>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl VirtualCluster {
    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVirtualClusterInput {
    pub name: String,
    pub container_provider: Option<ContainerProvider>,
    /// Idempotency token for the create call.
    pub client_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVirtualClusterOutput {
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeVirtualClusterOutput {
    #[serde(default)]
    pub virtual_cluster: Option<VirtualCluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVirtualClusterOutput {
    #[serde(default)]
    pub id: Option<String>,
}

/// Timestamps arrive as epoch seconds, or as RFC 3339 strings from some endpoints.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Seconds(f64),
        Text(String),
    }

    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawTimestamp::Seconds(secs)) => {
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
            Utc.timestamp_opt(whole, nanos)
                .single()
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
        }
        Some(RawTimestamp::Text(text)) => DateTime::parse_from_rfc3339(&text)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

/// Render a timestamp the way the attribute state stores it, e.g.
/// `2021-06-10 12:30:00 +0000 UTC` or `2022-01-02 03:04:05.25 +0000 UTC`.
///
/// The fractional second keeps only significant digits and is omitted
/// entirely when zero.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    let mut out = t.format("%Y-%m-%d %H:%M:%S").to_string();

    let nanos = t.timestamp_subsec_nanos() % 1_000_000_000;
    if nanos != 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }

    out.push_str(" +0000 UTC");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_output_with_epoch_timestamp() {
        let body = json!({
            "virtualCluster": {
                "id": "vc-1",
                "arn": "arn:aws:emr-containers:us-west-2:123456789012:/virtualclusters/vc-1",
                "name": "analytics",
                "state": "RUNNING",
                "containerProvider": {
                    "id": "eks-cluster",
                    "type": "EKS",
                    "info": { "eksInfo": { "namespace": "spark" } }
                },
                "createdAt": 1623328200.0
            }
        });

        let out: DescribeVirtualClusterOutput = serde_json::from_value(body).unwrap();
        let vc = out.virtual_cluster.unwrap();
        assert_eq!(vc.state(), "RUNNING");
        let provider = vc.container_provider.unwrap();
        assert_eq!(provider.provider_type, "EKS");
        assert_eq!(
            provider.info.unwrap().eks_info.unwrap().namespace.as_deref(),
            Some("spark")
        );
        assert_eq!(
            format_timestamp(&vc.created_at.unwrap()),
            "2021-06-10 12:30:00 +0000 UTC"
        );
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let body = json!({ "id": "vc-2", "createdAt": "2022-01-02T03:04:05.250Z" });
        let vc: VirtualCluster = serde_json::from_value(body).unwrap();
        assert_eq!(
            format_timestamp(&vc.created_at.unwrap()),
            "2022-01-02 03:04:05.25 +0000 UTC"
        );
        assert_eq!(vc.state(), "");
    }

    #[test]
    fn test_fractional_seconds_keep_only_significant_digits() {
        let at = |nanos: u32| Utc.timestamp_opt(1641092645, nanos).unwrap();

        assert_eq!(format_timestamp(&at(0)), "2022-01-02 03:04:05 +0000 UTC");
        assert_eq!(format_timestamp(&at(100_000_000)), "2022-01-02 03:04:05.1 +0000 UTC");
        assert_eq!(format_timestamp(&at(123_456_000)), "2022-01-02 03:04:05.123456 +0000 UTC");
        assert_eq!(format_timestamp(&at(1)), "2022-01-02 03:04:05.000000001 +0000 UTC");
    }

    #[test]
    fn test_arrested_state_is_reported_verbatim() {
        let body = json!({ "id": "vc-3", "state": virtual_cluster_state::ARRESTED });
        let vc: VirtualCluster = serde_json::from_value(body).unwrap();
        assert_eq!(vc.state(), "ARRESTED");
    }

    #[test]
    fn test_create_input_omits_absent_nested_blocks() {
        let input = CreateVirtualClusterInput {
            name: "analytics".to_string(),
            container_provider: Some(ContainerProvider {
                id: "eks-cluster".to_string(),
                provider_type: "EKS".to_string(),
                info: None,
            }),
            client_token: "token".to_string(),
        };

        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "analytics",
                "containerProvider": { "id": "eks-cluster", "type": "EKS" },
                "clientToken": "token"
            })
        );
    }
}
