//! Request shapes for each protected operation.
//!
//! Cluster, worker and VLAN calls go to the containers service, as do the
//! public catalog lookups (zones, versions, locations, machine types); tags to the
//! global tagging service; schedules and API key records live in the
//! document store, one `apikeys` document per account.

use serde_json::{json, Value};

use crate::downstream::{ApiRequest, Service};

const SCHEDULES_DB: &str = "schedules";
const SCHEDULES_V2_DB: &str = "schedules_v2";
const API_KEYS_DB: &str = "apikeys";

pub fn list_accounts(cursor: Option<String>) -> ApiRequest {
    match cursor {
        Some(cursor) => ApiRequest::cursor(Service::Accounts, cursor),
        None => ApiRequest::get(Service::Accounts, &["coe", "v2", "accounts"]),
    }
}

// ---------- clusters ----------

pub fn get_cluster(cluster_id: &str, resource_group: &str) -> ApiRequest {
    with_resource_group(
        ApiRequest::get(Service::Containers, &["global", "v1", "clusters", cluster_id]),
        resource_group,
    )
}

pub fn get_clusters(location: &str) -> ApiRequest {
    let request = ApiRequest::get(Service::Containers, &["global", "v1", "clusters"]);
    if location.is_empty() {
        request
    } else {
        request.header("X-Region", location)
    }
}

pub fn create_cluster(cluster: Value) -> ApiRequest {
    ApiRequest::post(Service::Containers, &["global", "v1", "clusters"]).json(cluster)
}

pub fn delete_cluster(cluster_id: &str, resource_group: &str, delete_resources: bool) -> ApiRequest {
    with_resource_group(
        ApiRequest::delete(Service::Containers, &["global", "v1", "clusters", cluster_id])
            .query("deleteResources", delete_resources.to_string()),
        resource_group,
    )
}

pub fn get_workers(cluster_id: &str) -> ApiRequest {
    ApiRequest::get(Service::Containers, &["global", "v1", "clusters", cluster_id, "workers"])
}

pub fn get_datacenter_vlans(datacenter: &str) -> ApiRequest {
    ApiRequest::get(Service::Containers, &["global", "v1", "datacenters", datacenter, "vlans"])
}

// ---------- public catalog ----------

pub fn get_zones(show_flavors: bool, location: &str) -> ApiRequest {
    let request = ApiRequest::get(Service::Containers, &["v1", "zones"]).query("showFlavors", show_flavors.to_string());
    if location.is_empty() {
        request
    } else {
        request.query("location", location)
    }
}

pub fn get_versions() -> ApiRequest {
    ApiRequest::get(Service::Containers, &["global", "v1", "versions"])
}

pub fn get_locations() -> ApiRequest {
    ApiRequest::get(Service::Containers, &["v1", "locations"])
}

pub fn get_geo_locations(geo: &str) -> ApiRequest {
    get_locations().query("geo", geo)
}

pub fn get_machine_types(datacenter: &str, server_type: &str, os: &str, cpu_limit: u32, memory_limit: u32) -> ApiRequest {
    ApiRequest::get(Service::Containers, &["v1", "datacenters", datacenter, "machine-types"])
        .query("type", server_type)
        .query("os", os)
        .query("cpuLimit", cpu_limit.to_string())
        .query("memoryLimit", memory_limit.to_string())
}

fn with_resource_group(request: ApiRequest, resource_group: &str) -> ApiRequest {
    if resource_group.is_empty() {
        request
    } else {
        request.header("X-Auth-Resource-Group", resource_group)
    }
}

// ---------- accounts & billing ----------

pub fn get_account_resources(account_id: &str) -> ApiRequest {
    ApiRequest::get(Service::ResourceController, &["v2", "resource_instances"])
        .query("account_id", account_id)
}

pub fn get_billing_data(account_id: &str, cluster_id: &str, cluster_crn: &str) -> ApiRequest {
    ApiRequest::get(
        Service::Billing,
        &["v4", "accounts", account_id, "resource_instances", "usage"],
    )
    .query("resource_instance_id", cluster_crn)
    .query("cluster_id", cluster_id)
}

// ---------- tags ----------

pub fn set_tag(update: Value) -> ApiRequest {
    ApiRequest::post(Service::Tagging, &["v3", "tags", "attach"]).json(update)
}

/// Attach `tag` to a cluster. The cluster's CRN (`resource_id`) is the tagged
/// resource; a bare cluster id is used when no CRN is known.
pub fn set_cluster_tag(tag: &str, cluster_id: &str, resource_id: &str) -> ApiRequest {
    let tagged = if resource_id.is_empty() { cluster_id } else { resource_id };
    set_tag(json!({
        "resources": [{ "resource_id": tagged }],
        "tag_names": [tag],
    }))
}

pub fn delete_tag(update: Value) -> ApiRequest {
    ApiRequest::post(Service::Tagging, &["v3", "tags", "detach"]).json(update)
}

pub fn get_tags(cluster_crn: &str) -> ApiRequest {
    ApiRequest::get(Service::Tagging, &["v3", "tags"]).query("attached_to", cluster_crn)
}

// ---------- API key records ----------

pub fn set_api_key(api_key: &str, account_id: &str) -> ApiRequest {
    ApiRequest::post(Service::Documents, &[API_KEYS_DB])
        .json(json!({ "_id": account_id, "api_key": api_key }))
}

pub fn check_api_key(account_id: &str) -> ApiRequest {
    ApiRequest::get(Service::Documents, &[API_KEYS_DB, account_id])
}

pub fn update_api_key(api_key: &str, account_id: &str) -> ApiRequest {
    ApiRequest::put(Service::Documents, &[API_KEYS_DB, account_id])
        .json(json!({ "api_key": api_key }))
}

pub fn delete_api_key(account_id: &str) -> ApiRequest {
    ApiRequest::delete(Service::Documents, &[API_KEYS_DB, account_id])
}

// ---------- schedule documents ----------

pub fn get_document(account_id: &str) -> ApiRequest {
    find_by_account(SCHEDULES_DB, account_id)
}

pub fn get_document_v2(account_id: &str) -> ApiRequest {
    find_by_account(SCHEDULES_V2_DB, account_id)
}

pub fn get_all_documents() -> ApiRequest {
    ApiRequest::get(Service::Documents, &[SCHEDULES_DB, "_all_docs"]).query("include_docs", "true")
}

pub fn create_document(account_id: &str, data: Value) -> ApiRequest {
    ApiRequest::post(Service::Documents, &[SCHEDULES_DB]).json(owned_by(data, account_id))
}

pub fn update_document(account_id: &str, id: &str, rev: &str, data: Value) -> ApiRequest {
    ApiRequest::put(Service::Documents, &[SCHEDULES_DB, id])
        .query("rev", rev)
        .json(owned_by(data, account_id))
}

pub fn delete_document(id: &str, rev: &str) -> ApiRequest {
    ApiRequest::delete(Service::Documents, &[SCHEDULES_DB, id]).query("rev", rev)
}

fn find_by_account(database: &str, account_id: &str) -> ApiRequest {
    ApiRequest::post(Service::Documents, &[database, "_find"])
        .json(json!({ "selector": { "account_id": account_id } }))
}

/// Stamp the owning account on object documents; other JSON is stored as given.
fn owned_by(mut data: Value, account_id: &str) -> Value {
    if let Value::Object(fields) = &mut data {
        fields.insert("account_id".to_string(), Value::String(account_id.to_string()));
    }
    data
}
