// Mapping between the attribute tree and the control plane structs.
//
// Singleton nested blocks are lists holding at most one map. Expanding an
// empty list yields None; flattening None yields an empty list (not an
// absent key). Stored state depends on that asymmetry.

use serde_json::{Map, Value};

use crate::api::types::{ContainerInfo, ContainerProvider, EksInfo};

fn first_block(l: &[Value]) -> Option<&Map<String, Value>> {
    l.first().and_then(Value::as_object)
}

fn string_field(m: &Map<String, Value>, key: &str) -> String {
    m.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn list_field<'a>(m: &'a Map<String, Value>, key: &str) -> Option<&'a [Value]> {
    m.get(key).and_then(Value::as_array).map(Vec::as_slice)
}

pub fn expand_container_provider(l: &[Value]) -> Option<ContainerProvider> {
    let m = first_block(l)?;

    Some(ContainerProvider {
        id: string_field(m, "id"),
        provider_type: string_field(m, "type"),
        info: list_field(m, "info").and_then(expand_container_info),
    })
}

pub fn expand_container_info(l: &[Value]) -> Option<ContainerInfo> {
    let m = first_block(l)?;

    Some(ContainerInfo {
        eks_info: list_field(m, "eks_info").and_then(expand_eks_info),
    })
}

pub fn expand_eks_info(l: &[Value]) -> Option<EksInfo> {
    let m = first_block(l)?;

    Some(EksInfo {
        namespace: m.get("namespace").and_then(Value::as_str).map(str::to_string),
    })
}

pub fn flatten_container_provider(cp: Option<&ContainerProvider>) -> Vec<Value> {
    let Some(cp) = cp else {
        return Vec::new();
    };

    let mut m = Map::new();
    m.insert("id".to_string(), Value::String(cp.id.clone()));
    m.insert("type".to_string(), Value::String(cp.provider_type.clone()));

    if let Some(info) = &cp.info {
        m.insert("info".to_string(), Value::Array(flatten_container_info(Some(info))));
    }

    vec![Value::Object(m)]
}

pub fn flatten_container_info(ci: Option<&ContainerInfo>) -> Vec<Value> {
    let Some(ci) = ci else {
        return Vec::new();
    };

    let mut m = Map::new();
    if let Some(eks_info) = &ci.eks_info {
        m.insert("eks_info".to_string(), Value::Array(flatten_eks_info(Some(eks_info))));
    }

    vec![Value::Object(m)]
}

pub fn flatten_eks_info(ei: Option<&EksInfo>) -> Vec<Value> {
    let Some(ei) = ei else {
        return Vec::new();
    };

    let mut m = Map::new();
    if let Some(namespace) = &ei.namespace {
        m.insert("namespace".to_string(), Value::String(namespace.clone()));
    }

    vec![Value::Object(m)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_provider() -> ContainerProvider {
        ContainerProvider {
            id: "eks-cluster".to_string(),
            provider_type: "EKS".to_string(),
            info: Some(ContainerInfo {
                eks_info: Some(EksInfo {
                    namespace: Some("spark".to_string()),
                }),
            }),
        }
    }

    #[test]
    fn test_expand_full_tree() {
        let tree = json!([{
            "id": "eks-cluster",
            "type": "EKS",
            "info": [{ "eks_info": [{ "namespace": "spark" }] }]
        }]);

        let provider = expand_container_provider(tree.as_array().unwrap());
        assert_eq!(provider, Some(full_provider()));
    }

    #[test]
    fn test_flatten_full_struct() {
        let flattened = flatten_container_provider(Some(&full_provider()));
        assert_eq!(
            Value::Array(flattened),
            json!([{
                "id": "eks-cluster",
                "type": "EKS",
                "info": [{ "eks_info": [{ "namespace": "spark" }] }]
            }])
        );
    }

    #[test]
    fn test_empty_list_expands_to_none() {
        assert_eq!(expand_container_provider(&[]), None);
        assert_eq!(expand_container_info(&[]), None);
        assert_eq!(expand_eks_info(&[]), None);
        assert_eq!(expand_container_provider(&[Value::Null]), None);
    }

    #[test]
    fn test_none_flattens_to_empty_list() {
        assert!(flatten_container_provider(None).is_empty());
        assert!(flatten_container_info(None).is_empty());
        assert!(flatten_eks_info(None).is_empty());
    }

    #[test]
    fn test_flatten_then_expand_is_not_identity_for_absent_blocks() {
        // None -> [] -> None, but the intermediate form is an empty list, never a missing key
        let provider = ContainerProvider {
            id: "eks-cluster".to_string(),
            provider_type: "EKS".to_string(),
            info: Some(ContainerInfo { eks_info: None }),
        };

        let flattened = flatten_container_provider(Some(&provider));
        assert_eq!(
            Value::Array(flattened.clone()),
            json!([{ "id": "eks-cluster", "type": "EKS", "info": [{}] }])
        );

        let expanded = expand_container_provider(&flattened).unwrap();
        assert_eq!(expanded.info, Some(ContainerInfo { eks_info: None }));

        let info_list = flatten_container_info(expanded.info.as_ref());
        let empty_eks = flatten_eks_info(None);
        assert_eq!(info_list.len(), 1);
        assert_eq!(empty_eks, Vec::<Value>::new());
        assert_eq!(expand_eks_info(&empty_eks), None);
    }

    #[test]
    fn test_namespace_copied_verbatim_including_empty() {
        let with_empty = json!([{ "namespace": "" }]);
        assert_eq!(
            expand_eks_info(with_empty.as_array().unwrap()),
            Some(EksInfo {
                namespace: Some(String::new())
            })
        );

        let without = json!([{}]);
        assert_eq!(
            expand_eks_info(without.as_array().unwrap()),
            Some(EksInfo { namespace: None })
        );
    }
}
