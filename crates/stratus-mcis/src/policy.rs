//! MCIS automation policy CRUD.
//!
//! Policy documents share the object store key scheme
//! (`/ns/{ns}/policy/mcis/{id}`). The primary store cannot distinguish
//! "value absent" from "empty value", so a lookup that produces a
//! zero-value document is translated into a not-found error here.

use tracing::debug;

use stratus_core::{Error, Result, check_id, keys};

use crate::model::{PolicyDoc, PolicyReq};
use crate::ops::McisService;

impl McisService {
    /// Create an automation policy for an MCIS.
    pub fn create_policy(&self, ns: &str, mcis_id: &str, req: &PolicyReq) -> Result<PolicyDoc> {
        check_id(ns)?;
        check_id(mcis_id)?;

        let key = keys::policy_key(ns, mcis_id);
        if self.lookup_policy(&key)?.is_some() {
            return Err(Error::Conflict(format!(
                "policy for mcis {mcis_id} already exists in namespace {ns}"
            )));
        }

        let doc = PolicyDoc {
            policy_id: mcis_id.to_string(),
            mcis_id: mcis_id.to_string(),
            auto_condition: req.auto_condition.clone(),
            auto_action: req.auto_action.clone(),
            status: "available".to_string(),
            description: req.description.clone(),
        };
        self.store().put(&key, &doc)?;
        debug!(ns, mcis = mcis_id, "policy stored");
        Ok(doc)
    }

    /// Get the automation policy of an MCIS.
    pub fn get_policy(&self, ns: &str, mcis_id: &str) -> Result<PolicyDoc> {
        check_id(ns)?;
        check_id(mcis_id)?;
        self.lookup_policy(&keys::policy_key(ns, mcis_id))?
            .ok_or_else(|| Error::NotFound(format!("policy for mcis {mcis_id} in namespace {ns}")))
    }

    /// All automation policies of a namespace.
    pub fn list_policies(&self, ns: &str) -> Result<Vec<PolicyDoc>> {
        check_id(ns)?;
        let mut docs: Vec<PolicyDoc> = self
            .store()
            .list::<PolicyDoc>(&keys::policy_prefix(ns))?
            .into_iter()
            .map(|(_, doc)| doc)
            .filter(|doc| !doc.policy_id.is_empty())
            .collect();
        docs.sort_by(|a, b| a.policy_id.cmp(&b.policy_id));
        Ok(docs)
    }

    /// Delete an MCIS's policy. Returns true if one existed.
    pub fn delete_policy(&self, ns: &str, mcis_id: &str) -> Result<bool> {
        check_id(ns)?;
        check_id(mcis_id)?;
        Ok(self.store().delete(&keys::policy_key(ns, mcis_id))?)
    }

    /// Delete every policy in a namespace. Returns the number deleted.
    pub fn delete_all_policies(&self, ns: &str) -> Result<u32> {
        check_id(ns)?;
        Ok(self.store().delete_prefix(&keys::policy_prefix(ns))?)
    }

    /// Read a policy key, mapping a stored zero-value document to `None`.
    fn lookup_policy(&self, key: &str) -> Result<Option<PolicyDoc>> {
        let doc = self.store().get::<PolicyDoc>(key)?;
        Ok(doc.filter(|d| !d.policy_id.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutoAction, AutoCondition, Mcis};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use stratus_gateway::{CloudDriver, GatewayResult, Method};
    use stratus_state::StateStore;

    struct NullDriver;

    #[async_trait]
    impl CloudDriver for NullDriver {
        async fn call(
            &self,
            _method: Method,
            _path: &str,
            _connection: &str,
            _body: Option<Value>,
            _deadline: Option<Duration>,
        ) -> GatewayResult<Value> {
            Ok(Value::Null)
        }
    }

    fn service() -> (McisService, StateStore) {
        let store = StateStore::open_in_memory().unwrap();
        (McisService::new(Arc::new(NullDriver), store.clone(), None), store)
    }

    fn policy_req() -> PolicyReq {
        PolicyReq {
            auto_condition: AutoCondition {
                metric: "cpu".to_string(),
                operator: ">=".to_string(),
                operand: "80".to_string(),
            },
            auto_action: AutoAction {
                action_type: "ScaleOut".to_string(),
                placement_algo: "random".to_string(),
                description: String::new(),
            },
            description: "scale on cpu pressure".to_string(),
        }
    }

    #[test]
    fn create_get_roundtrip() {
        let (service, _store) = service();
        service
            .register_mcis("ns01", &Mcis { id: "mcis01".to_string(), ..Mcis::default() })
            .unwrap();

        let created = service.create_policy("ns01", "mcis01", &policy_req()).unwrap();
        assert_eq!(created.policy_id, "mcis01");
        assert_eq!(created.status, "available");

        let got = service.get_policy("ns01", "mcis01").unwrap();
        assert_eq!(got, created);
    }

    #[test]
    fn duplicate_create_conflicts() {
        let (service, _store) = service();
        service.create_policy("ns01", "mcis01", &policy_req()).unwrap();

        let err = service.create_policy("ns01", "mcis01", &policy_req());
        assert!(matches!(err, Err(Error::Conflict(_))));
    }

    #[test]
    fn absent_policy_is_not_found() {
        let (service, _store) = service();
        assert!(matches!(
            service.get_policy("ns01", "ghost"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn zero_value_document_reads_as_not_found() {
        let (service, store) = service();
        // An external writer left an empty document behind; the store cannot
        // tell that apart from a real one, this layer must.
        store
            .put("/ns/ns01/policy/mcis/mcis01", &PolicyDoc::default())
            .unwrap();

        assert!(matches!(
            service.get_policy("ns01", "mcis01"),
            Err(Error::NotFound(_))
        ));
        // A zero-value slot is free to create into.
        assert!(service.create_policy("ns01", "mcis01", &policy_req()).is_ok());
    }

    #[test]
    fn list_skips_zero_value_documents() {
        let (service, store) = service();
        service.create_policy("ns01", "mcis01", &policy_req()).unwrap();
        service.create_policy("ns01", "mcis02", &policy_req()).unwrap();
        store
            .put("/ns/ns01/policy/mcis/empty", &PolicyDoc::default())
            .unwrap();

        let docs = service.list_policies("ns01").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].policy_id, "mcis01");
    }

    #[test]
    fn delete_and_delete_all() {
        let (service, _store) = service();
        service.create_policy("ns01", "mcis01", &policy_req()).unwrap();
        service.create_policy("ns01", "mcis02", &policy_req()).unwrap();

        assert!(service.delete_policy("ns01", "mcis01").unwrap());
        assert!(!service.delete_policy("ns01", "mcis01").unwrap());

        assert_eq!(service.delete_all_policies("ns01").unwrap(), 1);
        assert!(service.list_policies("ns01").unwrap().is_empty());
    }
}
