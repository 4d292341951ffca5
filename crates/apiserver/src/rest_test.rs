//! Unit tests for the ExternalIPRequest REST adapter

#[cfg(test)]
mod tests {
    use crate::error::ApiError;
    use crate::meta::ObjectMetaFiller;
    use crate::mock::{MemoryRegistry, Operation, RegistryCall};
    use crate::rest::{ExternalIPRequestRest, ResourceWatcher, RestStorage};
    use crate::status;
    use crds::{ExternalIPRequest, ExternalIPRequestList, ExternalIPRequestSpec};
    use futures::StreamExt;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use registry::{
        ExternalIPRequestRegistry, RegistryError, RequestContext, RequestFilter, Selector, WatchEvent,
        WatchStream,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    /// Assigns a fixed UID instead of a random one
    #[derive(Debug)]
    struct FixedUid(&'static str);

    impl ObjectMetaFiller for FixedUid {
        fn fill(&self, _ctx: &RequestContext, meta: &mut ObjectMeta) {
            meta.uid = Some(self.0.to_string());
        }
    }

    fn setup() -> (MemoryRegistry, ExternalIPRequestRest) {
        let registry = MemoryRegistry::new();
        let rest = ExternalIPRequestRest::with_meta_filler(Arc::new(registry.clone()), Arc::new(FixedUid("abc123")));
        (registry, rest)
    }

    fn create_test_request(name: &str, namespace: &str, labels: &[(&str, &str)]) -> ExternalIPRequest {
        ExternalIPRequest {
            metadata: ObjectMeta {
                name: (!name.is_empty()).then(|| name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..Default::default()
            },
            spec: ExternalIPRequestSpec {
                service_name: Some("web".to_string()),
                ..Default::default()
            },
            status: None,
        }
    }

    fn call(operation: Operation, namespace: &str, name: Option<&str>) -> RegistryCall {
        RegistryCall {
            operation,
            namespace: Some(namespace.to_string()),
            name: name.map(str::to_string),
        }
    }

    fn names(list: &ExternalIPRequestList) -> Vec<String> {
        list.items
            .iter()
            .filter_map(|r| r.metadata.name.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_create_defaults_name_to_uid() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");
        let request = create_test_request("", "default", &[("team", "infra")]);

        let created = rest.create(&ctx, request).unwrap().await.unwrap();

        assert_eq!(created.metadata.name.as_deref(), Some("abc123"));
        assert_eq!(created.metadata.uid.as_deref(), Some("abc123"));
        assert_eq!(
            registry.calls(),
            vec![
                call(Operation::Create, "default", Some("abc123")),
                call(Operation::Get, "default", Some("abc123")),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_keeps_explicit_name() {
        let (_registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");

        let created = rest
            .create(&ctx, create_test_request("web", "default", &[]))
            .unwrap()
            .await
            .unwrap();

        assert_eq!(created.metadata.name.as_deref(), Some("web"));
        assert_eq!(created.metadata.uid.as_deref(), Some("abc123"));
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_create_with_default_filler_assigns_uuid_name() {
        let registry = MemoryRegistry::new();
        let rest = ExternalIPRequestRest::new(Arc::new(registry.clone()));
        let ctx = RequestContext::with_namespace("default");

        let created = rest
            .create(&ctx, create_test_request("", "default", &[]))
            .unwrap()
            .await
            .unwrap();

        assert!(created.metadata.uid.is_some());
        assert_eq!(created.metadata.name, created.metadata.uid);
        assert!(created.metadata.creation_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_create_namespace_mismatch_is_conflict() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");

        let err = rest
            .create(&ctx, create_test_request("web", "other", &[]))
            .unwrap_err();

        assert!(err.is_conflict());
        assert!(registry.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_without_context_namespace_is_conflict() {
        let (registry, rest) = setup();

        let err = rest
            .create(&RequestContext::new(), create_test_request("web", "default", &[]))
            .unwrap_err();

        assert!(err.is_conflict());
        assert!(registry.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_adopts_context_namespace() {
        let (_registry, rest) = setup();
        let ctx = RequestContext::with_namespace("team-a");
        let mut request = create_test_request("web", "", &[]);
        request.metadata.namespace = None;

        let created = rest.create(&ctx, request).unwrap().await.unwrap();
        assert_eq!(created.metadata.namespace.as_deref(), Some("team-a"));
    }

    #[tokio::test]
    async fn test_create_propagates_registry_error() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");
        registry.fail_next(Operation::Create, RegistryError::Internal("etcd unavailable".to_string()));

        let err = rest
            .create(&ctx, create_test_request("web", "default", &[]))
            .unwrap()
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Registry(RegistryError::Internal(msg)) if msg == "etcd unavailable"));
        assert_eq!(registry.calls(), vec![call(Operation::Create, "default", Some("web"))]);
    }

    #[tokio::test]
    async fn test_create_read_back_error_propagates() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");
        registry.fail_next(Operation::Get, RegistryError::NotFound("web".to_string()));

        let err = rest
            .create(&ctx, create_test_request("web", "default", &[]))
            .unwrap()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Registry(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let (_registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");

        let result = rest.get(&ctx, "missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_returns_stored_request() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");
        registry.insert(create_test_request("web", "default", &[("team", "infra")]));

        let found = rest.get(&ctx, "web").await.unwrap().unwrap();
        assert_eq!(found.spec.service_name.as_deref(), Some("web"));
    }

    #[tokio::test]
    async fn test_get_propagates_registry_error() {
        let (registry, rest) = setup();
        registry.fail_next(Operation::Get, RegistryError::Internal("boom".to_string()));

        let err = rest
            .get(&RequestContext::with_namespace("default"), "web")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Registry(RegistryError::Internal(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_label_and_field() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");
        registry.insert(create_test_request("web", "default", &[("team", "infra")]));
        registry.insert(create_test_request("db", "default", &[("team", "data")]));
        registry.insert(create_test_request("lb", "default", &[("team", "infra"), ("tier", "edge")]));

        let infra: Selector = "team=infra".parse().unwrap();
        let everything = Selector::everything();

        let list = rest.list(&ctx, &infra, &everything).await.unwrap();
        assert_eq!(names(&list), vec!["lb".to_string(), "web".to_string()]);

        let by_name = Selector::parse_fields("name=web").unwrap();
        let list = rest.list(&ctx, &infra, &by_name).await.unwrap();
        assert_eq!(names(&list), vec!["web".to_string()]);

        let not_web = Selector::parse_fields("name!=web").unwrap();
        let list = rest.list(&ctx, &everything, &not_web).await.unwrap();
        assert_eq!(names(&list), vec!["db".to_string(), "lb".to_string()]);

        let none: Selector = "team=other".parse().unwrap();
        assert!(rest.list(&ctx, &none, &everything).await.unwrap().is_empty());

        assert!(registry.calls().iter().all(|c| c.operation == Operation::ListPredicate));
    }

    #[tokio::test]
    async fn test_create_then_list_example() {
        let (_registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");
        let mut request = create_test_request("", "default", &[("team", "infra")]);
        request.metadata.uid = Some("abc123".to_string());

        let created = rest.create(&ctx, request).unwrap().await.unwrap();
        assert_eq!(created.metadata.name.as_deref(), Some("abc123"));

        let everything = Selector::everything();
        let list = rest.list(&ctx, &"team=infra".parse().unwrap(), &everything).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.items[0], created);

        let list = rest.list(&ctx, &"team=other".parse().unwrap(), &everything).await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_update_writes_then_reads_back() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");
        registry.insert(create_test_request("web", "default", &[("team", "infra")]));

        let mut request = rest.get(&ctx, "web").await.unwrap().unwrap();
        request.spec.preferred_ip = Some("203.0.113.10".to_string());
        registry.clear_calls();

        let updated = rest.update(&ctx, request).unwrap().await.unwrap();

        assert_eq!(updated.spec.preferred_ip.as_deref(), Some("203.0.113.10"));
        assert_eq!(
            registry.calls(),
            vec![
                call(Operation::Update, "default", Some("web")),
                call(Operation::Get, "default", Some("web")),
            ]
        );
        let stored = rest.get(&ctx, "web").await.unwrap().unwrap();
        assert_eq!(updated, stored);
    }

    #[tokio::test]
    async fn test_update_does_not_default_name() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");

        let err = rest
            .update(&ctx, create_test_request("", "default", &[]))
            .unwrap()
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Registry(RegistryError::InvalidRequest(_))));
        assert_eq!(registry.calls(), vec![call(Operation::Update, "default", None)]);
    }

    #[tokio::test]
    async fn test_update_error_skips_read_back() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");
        registry.insert(create_test_request("web", "default", &[]));
        registry.fail_next(
            Operation::Update,
            RegistryError::Conflict {
                name: "web".to_string(),
                message: "stale".to_string(),
            },
        );

        let err = rest
            .update(&ctx, create_test_request("web", "default", &[]))
            .unwrap()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Registry(RegistryError::Conflict { ref name, ref message }) if name == "web" && message == "stale"
        ));
        assert_eq!(registry.calls(), vec![call(Operation::Update, "default", Some("web"))]);
    }

    #[tokio::test]
    async fn test_update_namespace_mismatch_is_conflict() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");

        let err = rest
            .update(&ctx, create_test_request("web", "kube-system", &[]))
            .unwrap_err();

        assert!(matches!(err, ApiError::Conflict { kind: "externaliprequest", ref name, .. } if name == "kube-system"));
        assert!(registry.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_without_namespace_is_soft_failure() {
        let (registry, rest) = setup();

        let result = rest.delete(&RequestContext::new(), "web").await.unwrap();

        assert_eq!(result.status.as_deref(), Some(status::STATUS_FAILURE));
        assert!(!status::is_success(&result));
        assert!(registry.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_success() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");
        registry.insert(create_test_request("web", "default", &[]));

        let result = rest.delete(&ctx, "web").await.unwrap();

        assert!(status::is_success(&result));
        assert!(registry.is_empty());
        assert_eq!(registry.calls(), vec![call(Operation::Delete, "default", Some("web"))]);
    }

    #[tokio::test]
    async fn test_delete_propagates_registry_error() {
        let (_registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");

        let err = rest.delete(&ctx, "missing").await.unwrap_err();
        assert!(matches!(err, ApiError::Registry(RegistryError::NotFound(name)) if name == "missing"));
    }

    #[tokio::test]
    async fn test_watch_passes_through() {
        let (registry, rest) = setup();
        let ctx = RequestContext::with_namespace("default");

        let mut stream = rest
            .watch(&ctx, &"team=infra".parse().unwrap(), &Selector::everything(), "")
            .await
            .unwrap();
        assert_eq!(registry.calls(), vec![call(Operation::Watch, "default", None)]);

        rest.create(&ctx, create_test_request("db", "default", &[("team", "data")]))
            .unwrap()
            .await
            .unwrap();
        rest.create(&ctx, create_test_request("web", "default", &[("team", "infra")]))
            .unwrap()
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match event {
            WatchEvent::Added(request) => assert_eq!(request.metadata.name.as_deref(), Some("web")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_factories_return_empty_values() {
        let (_registry, rest) = setup();
        let object = rest.new_object();
        assert!(object.metadata.name.is_none());
        assert!(object.status.is_none());
        assert!(rest.new_list().is_empty());
    }

    /// Registry whose writes never complete
    struct StalledRegistry(MemoryRegistry);

    #[async_trait::async_trait]
    impl ExternalIPRequestRegistry for StalledRegistry {
        async fn list_external_ip_requests(
            &self,
            ctx: &RequestContext,
            selector: &Selector,
        ) -> Result<ExternalIPRequestList, RegistryError> {
            self.0.list_external_ip_requests(ctx, selector).await
        }

        async fn list_external_ip_requests_predicate(
            &self,
            ctx: &RequestContext,
            filter: &RequestFilter<'_>,
        ) -> Result<ExternalIPRequestList, RegistryError> {
            self.0.list_external_ip_requests_predicate(ctx, filter).await
        }

        async fn watch_external_ip_requests(
            &self,
            ctx: &RequestContext,
            label: &Selector,
            field: &Selector,
            resource_version: &str,
        ) -> Result<WatchStream, RegistryError> {
            self.0.watch_external_ip_requests(ctx, label, field, resource_version).await
        }

        async fn get_external_ip_request(
            &self,
            ctx: &RequestContext,
            name: &str,
        ) -> Result<Option<ExternalIPRequest>, RegistryError> {
            self.0.get_external_ip_request(ctx, name).await
        }

        async fn create_external_ip_request(
            &self,
            _ctx: &RequestContext,
            _request: &ExternalIPRequest,
        ) -> Result<(), RegistryError> {
            futures::future::pending().await
        }

        async fn update_external_ip_request(
            &self,
            _ctx: &RequestContext,
            _request: &ExternalIPRequest,
        ) -> Result<(), RegistryError> {
            futures::future::pending().await
        }

        async fn delete_external_ip_request(&self, ctx: &RequestContext, name: &str) -> Result<(), RegistryError> {
            self.0.delete_external_ip_request(ctx, name).await
        }
    }

    #[tokio::test]
    async fn test_aborted_create_reports_cancelled() {
        let rest = ExternalIPRequestRest::new(Arc::new(StalledRegistry(MemoryRegistry::new())));
        let ctx = RequestContext::with_namespace("default");

        let pending = rest.create(&ctx, create_test_request("web", "default", &[])).unwrap();
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());
        pending.abort();

        assert!(matches!(pending.await, Err(ApiError::Cancelled)));
    }

    #[tokio::test]
    async fn test_caller_timeout_leaves_update_pending() {
        let rest = ExternalIPRequestRest::new(Arc::new(StalledRegistry(MemoryRegistry::new())));
        let ctx = RequestContext::with_namespace("default");

        let pending = rest.update(&ctx, create_test_request("web", "default", &[])).unwrap();
        let timed_out = tokio::time::timeout(Duration::from_millis(20), pending).await;
        assert!(timed_out.is_err());
    }
}
