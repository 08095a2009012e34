//! Tests for catalog store operations

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::backend::{
        BackendError, CommitMode, IndexClient, IndexDocument, SearchRequest, SearchResponse,
        SortOrder,
    };
    use crate::config::StoreConfig;
    use crate::metacard::{Record, CREATED, EFFECTIVE, MODIFIED};
    use crate::predicate::Predicate;
    use crate::schema::{SchemaResolver, SuffixSchemaResolver};
    use crate::store::{CatalogStore, Query, SortKey};

    // =========================================================================
    // Recording client
    // =========================================================================

    #[derive(Default)]
    struct RecordingClient {
        responses: Mutex<VecDeque<Result<SearchResponse, BackendError>>>,
        searches: Mutex<Vec<SearchRequest>>,
        added: Mutex<Vec<Vec<IndexDocument>>>,
        deleted: Mutex<Vec<Vec<String>>>,
        commits: Mutex<Vec<CommitMode>>,
        fail_writes: bool,
        down: bool,
    }

    impl RecordingClient {
        fn respond(&self, num_found: u64, documents: Vec<IndexDocument>) {
            self.responses.lock().push_back(Ok(SearchResponse {
                num_found,
                documents,
            }));
        }

        fn fail_next_search(&self, error: BackendError) {
            self.responses.lock().push_back(Err(error));
        }

        fn last_search(&self) -> SearchRequest {
            self.searches.lock().last().cloned().unwrap()
        }
    }

    impl IndexClient for RecordingClient {
        fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
            self.searches.lock().push(request.clone());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(SearchResponse::default()))
        }

        fn add(&self, documents: Vec<IndexDocument>) -> Result<(), BackendError> {
            if self.fail_writes {
                return Err(BackendError::Server {
                    status: 500,
                    message: "disk full".into(),
                });
            }
            self.added.lock().push(documents);
            Ok(())
        }

        fn delete_by_ids(&self, ids: &[String]) -> Result<(), BackendError> {
            self.deleted.lock().push(ids.to_vec());
            Ok(())
        }

        fn commit(&self, mode: CommitMode) -> Result<(), BackendError> {
            self.commits.lock().push(mode);
            Ok(())
        }

        fn ping(&self) -> Result<(), BackendError> {
            if self.down {
                Err(BackendError::Transport("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    fn store_with(client: RecordingClient, config: StoreConfig) -> (CatalogStore, Arc<RecordingClient>) {
        let client = Arc::new(client);
        let store = CatalogStore::new(
            Arc::clone(&client) as Arc<dyn IndexClient>,
            Arc::new(SuffixSchemaResolver::new()),
            config,
        );
        (store, client)
    }

    fn store() -> (CatalogStore, Arc<RecordingClient>) {
        store_with(RecordingClient::default(), StoreConfig::default())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 5, 17, 8, 30, 0).unwrap()
    }

    fn stored(id: &str, title: &str) -> IndexDocument {
        let record = Record::basic()
            .with("id", id)
            .with("title", title)
            .with(CREATED, t0());
        SuffixSchemaResolver::new().encode_record(&record).unwrap()
    }

    // =========================================================================
    // Query
    // =========================================================================

    #[test]
    fn test_query_rejects_start_index_below_one_before_backend_call() {
        let (store, client) = store();

        for start in [0, -1] {
            let err = store
                .query(&Query::new(Predicate::Include).with_start_index(start))
                .unwrap_err();
            assert_eq!(err.code(), "CAT-001");
        }
        assert!(client.searches.lock().is_empty());
    }

    #[test]
    fn test_query_start_index_is_one_based() {
        let (store, client) = store();

        store.query(&Query::new(Predicate::Include)).unwrap();
        assert_eq!(client.last_search().start, 0);

        store
            .query(&Query::new(Predicate::Include).with_start_index(11).with_page_size(5))
            .unwrap();
        let request = client.last_search();
        assert_eq!(request.start, 10);
        assert_eq!(request.rows, 5);
    }

    #[test]
    fn test_query_unbounded_page_size_uses_max_rows() {
        let (store, client) = store();

        store
            .query(&Query::new(Predicate::Include).with_page_size(0))
            .unwrap();

        assert_eq!(client.last_search().rows, StoreConfig::default().max_rows);
    }

    #[test]
    fn test_query_total_hits() {
        // Arrange
        let (store, client) = store();
        client.respond(57, vec![stored("a", "A"), stored("b", "B")]);
        client.respond(57, vec![stored("a", "A"), stored("b", "B")]);

        // Act
        let with_count = store
            .query(&Query::new(Predicate::Include).with_total_count())
            .unwrap();
        let without_count = store.query(&Query::new(Predicate::Include)).unwrap();

        // Assert
        assert_eq!(with_count.total_hits, 57);
        assert_eq!(without_count.total_hits, 2);
    }

    #[test]
    fn test_query_decodes_records_and_skips_private_fields() {
        // Arrange
        let (store, client) = store();
        client.respond(1, vec![stored("a", "Harbor").with("_version_", 12)]);

        // Act
        let response = store.query(&Query::new(Predicate::Include)).unwrap();

        // Assert
        let record = &response.results[0].record;
        assert_eq!(record.id(), Some("a"));
        assert_eq!(record.text("title"), Some("Harbor"));
        assert_eq!(record.date(CREATED), Some(t0()));
        assert_eq!(record.source_id.as_deref(), Some("metacat"));
        assert!(record.attribute("_version_").is_none());
        assert!(record.attributes().all(|a| !a.name.ends_with("_tokenized")));
        assert_eq!(record.record_type.name, "metacard");
    }

    #[test]
    fn test_query_relevance_sort() {
        // Arrange
        let (store, client) = store();
        client.respond(1, vec![stored("a", "A").with("score", 2.5)]);
        let query = Query::new(Predicate::fuzzy("title", "harbor"))
            .sorted_by(SortKey::Relevance, SortOrder::Descending);

        // Act
        let response = store.query(&query).unwrap();

        // Assert
        let request = client.last_search();
        assert_eq!(request.sort[0].field, "score");
        assert_eq!(request.sort[0].order, SortOrder::Descending);
        assert!(request.fields.contains(&"score".to_string()));
        assert_eq!(response.results[0].relevance, Some(2.5));
        assert_eq!(response.results[0].distance_meters, None);
    }

    #[test]
    fn test_query_distance_sort() {
        // Arrange
        let (store, client) = store();
        client.respond(1, vec![stored("a", "A").with("_distance_", 0.25)]);
        let query = Query::new(Predicate::and(vec![
            Predicate::equals("status", "active"),
            Predicate::within_distance("location", "POINT(10 20)", 500.0),
        ]))
        .sorted_by(SortKey::Distance, SortOrder::Descending);

        // Act
        let response = store.query(&query).unwrap();

        // Assert
        let request = client.last_search();
        assert!(request.query.starts_with("({!score=distance}location_geo_index:"));
        assert_eq!(request.sort[0].field, "geodist()");
        assert_eq!(request.sort[0].order, SortOrder::Descending);
        assert_eq!(request.params.get("sfield").map(String::as_str), Some("location_geo_sort"));
        assert_eq!(request.params.get("pt").map(String::as_str), Some("20,10"));
        assert!(request.fields.contains(&"_distance_:geodist()".to_string()));
        let distance = response.results[0].distance_meters.unwrap();
        assert!((distance - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_query_distance_sort_without_spatial_filter_is_unsorted() {
        let (store, client) = store();

        store
            .query(&Query::new(Predicate::Include).sorted_by(SortKey::Distance, SortOrder::Ascending))
            .unwrap();

        assert!(client.last_search().sort.is_empty());
    }

    #[test]
    fn test_query_temporal_and_attribute_sort() {
        let (store, client) = store();

        store
            .query(&Query::new(Predicate::Include).sorted_by(SortKey::Temporal, SortOrder::Ascending))
            .unwrap();
        assert_eq!(client.last_search().sort[0].field, "effective_tdt_sort");

        store
            .query(&Query::new(Predicate::Include).sorted_by(
                SortKey::Attribute("title".into()),
                SortOrder::Ascending,
            ))
            .unwrap();
        assert_eq!(client.last_search().sort[0].field, "title_txt_sort");
    }

    #[test]
    fn test_query_unresolvable_sort_attribute() {
        let (store, client) = store();

        let err = store
            .query(&Query::new(Predicate::Include).sorted_by(
                SortKey::Attribute("nothing".into()),
                SortOrder::Ascending,
            ))
            .unwrap_err();

        assert_eq!(err.code(), "CAT-005");
        assert!(client.searches.lock().is_empty());
    }

    #[test]
    fn test_query_backend_failure_is_query_failed_without_retry() {
        // Arrange
        let (store, client) = store();
        client.fail_next_search(BackendError::Parse("undefined field".into()));

        // Act
        let err = store.query(&Query::new(Predicate::Include)).unwrap_err();

        // Assert
        assert_eq!(err.code(), "CAT-002");
        assert!(!err.is_retryable());
        assert_eq!(client.searches.lock().len(), 1);
    }

    #[test]
    fn test_query_transport_failure_is_retryable() {
        // Arrange
        let (store, client) = store();
        client.fail_next_search(BackendError::Transport("connection reset".into()));

        // Act
        let err = store.query(&Query::new(Predicate::Include)).unwrap_err();

        // Assert
        assert_eq!(err.code(), "CAT-002");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_query_unknown_record_type_is_query_failed() {
        let (store, client) = store();
        client.respond(
            1,
            vec![IndexDocument::new()
                .with("_record_type_", "mystery")
                .with("title_txt", "A")],
        );

        let err = store.query(&Query::new(Predicate::Include)).unwrap_err();

        assert_eq!(err.code(), "CAT-002");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_query_malformed_filter_is_unsupported() {
        let (store, client) = store();

        let err = store
            .query(&Query::new(Predicate::and(vec![])))
            .unwrap_err();

        assert_eq!(err.code(), "CAT-001");
        assert!(client.searches.lock().is_empty());
    }

    #[test]
    fn test_query_xpath_disabled_by_config() {
        let config = StoreConfig {
            xpath_enabled: false,
            ..StoreConfig::default()
        };
        let (store, _client) = store_with(RecordingClient::default(), config);

        let err = store
            .query(&Query::new(Predicate::xpath_exists("/a")))
            .unwrap_err();

        assert_eq!(err.code(), "CAT-001");
    }

    // =========================================================================
    // Create
    // =========================================================================

    #[test]
    fn test_create_assigns_ids_and_writes_one_batch() {
        // Arrange
        let (store, client) = store();
        let records = vec![
            Record::basic().with("title", "one"),
            Record::basic().with("title", "two").with("id", "given"),
        ];

        // Act
        let created = store.create(records).unwrap();

        // Assert
        let generated = created[0].id().unwrap();
        assert_eq!(generated.len(), 32);
        assert!(generated.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(created[0].source_id.as_deref(), Some("metacat"));
        assert_eq!(created[1].id(), Some("given"));

        let added = client.added.lock();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].len(), 2);
        assert_eq!(added[0][0].first("id_txt"), Some(&json!(generated)));
        assert!(client.commits.lock().is_empty());
    }

    #[test]
    fn test_create_forced_auto_commit_soft_commits() {
        let config = StoreConfig {
            forced_auto_commit: true,
            ..StoreConfig::default()
        };
        let (store, client) = store_with(RecordingClient::default(), config);

        store.create(vec![Record::basic().with("title", "x")]).unwrap();

        assert_eq!(*client.commits.lock(), vec![CommitMode::Soft]);
    }

    #[test]
    fn test_create_foreign_record_without_id_is_configuration_error() {
        // Arrange
        let (store, client) = store();
        let mut record = Record::basic().with("title", "remote");
        record.source_id = Some("other-catalog".into());

        // Act
        let err = store.create(vec![record]).unwrap_err();

        // Assert
        assert_eq!(err.code(), "CAT-004");
        assert!(err.to_string().contains("other-catalog"));
        assert!(client.added.lock().is_empty());
    }

    #[test]
    fn test_create_foreign_record_with_id_keeps_source() {
        let (store, _client) = store();
        let mut record = Record::basic().with("id", "r1");
        record.source_id = Some("other-catalog".into());

        let created = store.create(vec![record]).unwrap();

        assert_eq!(created[0].source_id.as_deref(), Some("other-catalog"));
    }

    #[test]
    fn test_create_write_failure_is_ingest_failed() {
        let client = RecordingClient {
            fail_writes: true,
            ..RecordingClient::default()
        };
        let (store, _client) = store_with(client, StoreConfig::default());

        let err = store.create(vec![Record::basic()]).unwrap_err();

        assert_eq!(err.code(), "CAT-003");
    }

    // =========================================================================
    // Update
    // =========================================================================

    #[test]
    fn test_update_requires_key_attribute() {
        let (store, client) = store();

        let err = store
            .update(vec![("a".into(), Record::basic())], None)
            .unwrap_err();

        assert_eq!(err.code(), "CAT-004");
        assert!(client.searches.lock().is_empty());
    }

    #[test]
    fn test_update_keeps_identity_and_stamps_dates() {
        // Arrange
        let (store, client) = store();
        client.respond(1, vec![stored("I", "A")]);
        let replacement = Record::basic().with("title", "A").with("description", "v2");

        // Act
        let updates = store
            .update(vec![("A".into(), replacement)], Some("title"))
            .unwrap();

        // Assert
        assert_eq!(updates.len(), 1);
        let new = &updates[0].new;
        assert_eq!(new.id(), Some("I"));
        assert_eq!(new.date(CREATED), Some(t0()));
        assert!(new.date(MODIFIED).is_some());
        assert_eq!(new.date(EFFECTIVE), new.date(MODIFIED));
        assert_eq!(updates[0].old.id(), Some("I"));
        assert_eq!(client.added.lock().len(), 1);
    }

    #[test]
    fn test_update_keeps_supplied_effective_date() {
        let (store, client) = store();
        client.respond(1, vec![stored("I", "A")]);
        let replacement = Record::basic().with("title", "A").with(EFFECTIVE, t0());

        let updates = store
            .update(vec![("A".into(), replacement)], Some("title"))
            .unwrap();

        assert_eq!(updates[0].new.date(EFFECTIVE), Some(t0()));
    }

    #[test]
    fn test_update_skips_unmatched_keys() {
        // Arrange
        let (store, client) = store();
        client.respond(1, vec![stored("I", "A")]);

        // Act
        let updates = store
            .update(
                vec![
                    ("A".into(), Record::basic().with("title", "A")),
                    ("B".into(), Record::basic().with("title", "B")),
                ],
                Some("title"),
            )
            .unwrap();

        // Assert
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].old.text("title"), Some("A"));
        assert_eq!(client.added.lock()[0].len(), 1);
        assert_eq!(
            client.last_search().query,
            r#"title_txt:"A" OR title_txt:"B""#
        );
    }

    #[test]
    fn test_update_nothing_matched_writes_nothing() {
        let (store, client) = store();

        let updates = store
            .update(vec![("Z".into(), Record::basic())], Some("title"))
            .unwrap();

        assert!(updates.is_empty());
        assert!(client.added.lock().is_empty());
    }

    #[test]
    fn test_update_too_many_matches() {
        let (store, client) = store();
        client.respond(2, vec![stored("1", "A"), stored("2", "A")]);

        let err = store
            .update(vec![("A".into(), Record::basic())], Some("title"))
            .unwrap_err();

        assert_eq!(err.code(), "CAT-006");
        assert!(client.added.lock().is_empty());
    }

    #[test]
    fn test_update_unresolvable_key() {
        let (store, _client) = store();

        let err = store
            .update(vec![("x".into(), Record::basic())], Some("nothing"))
            .unwrap_err();

        assert_eq!(err.code(), "CAT-005");
    }

    #[test]
    fn test_update_lookup_quotes_keys_without_wildcard_escaping() {
        let (store, client) = store();

        store
            .update(vec![(r#"a*"b"#.into(), Record::basic())], Some("title"))
            .unwrap();

        assert_eq!(client.last_search().query, r#"title_txt:"a*\"b""#);
    }

    #[test]
    fn test_update_date_key_matches_stored_date() {
        // Arrange
        let (store, client) = store();
        client.respond(1, vec![stored("I", "A")]);

        // Act
        let updates = store
            .update(
                vec![(
                    "2020-05-17T08:30:00Z".into(),
                    Record::basic().with("title", "A2"),
                )],
                Some(CREATED),
            )
            .unwrap();

        // Assert
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].new.id(), Some("I"));
        assert_eq!(updates[0].new.date(CREATED), Some(t0()));
        assert_eq!(client.added.lock().len(), 1);
        assert!(client
            .last_search()
            .query
            .ends_with(r#":"2020-05-17T08:30:00.000Z""#));
    }

    #[test]
    fn test_update_date_key_with_offset_matches_stored_date() {
        let (store, client) = store();
        client.respond(1, vec![stored("I", "A")]);

        let updates = store
            .update(
                vec![(
                    "2020-05-17T10:30:00+02:00".into(),
                    Record::basic().with("title", "A2"),
                )],
                Some(CREATED),
            )
            .unwrap();

        assert_eq!(updates.len(), 1);
    }

    #[test]
    fn test_update_unknown_stored_record_type_is_ingest_failed() {
        // Arrange
        let (store, client) = store();
        client.respond(
            1,
            vec![IndexDocument::new()
                .with("_record_type_", "mystery")
                .with("title_txt", "A")],
        );

        // Act
        let err = store
            .update(vec![("A".into(), Record::basic().with("title", "A"))], Some("title"))
            .unwrap_err();

        // Assert
        assert_eq!(err.code(), "CAT-003");
        assert!(client.added.lock().is_empty());
    }

    #[test]
    fn test_update_lookup_transport_failure_is_retryable() {
        let (store, client) = store();
        client.fail_next_search(BackendError::Transport("timed out".into()));

        let err = store
            .update(vec![("A".into(), Record::basic())], Some("title"))
            .unwrap_err();

        assert_eq!(err.code(), "CAT-003");
        assert!(err.is_retryable());
    }

    // =========================================================================
    // Delete
    // =========================================================================

    #[test]
    fn test_delete_by_id_uses_supplied_values() {
        // Arrange
        let (store, client) = store();
        client.respond(2, vec![stored("b", "B"), stored("a", "A")]);

        // Act
        let deleted = store
            .delete(vec!["a".into(), "b".into()], Some("id"))
            .unwrap();

        // Assert
        let mut ids: Vec<&str> = deleted.iter().filter_map(Record::id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(*client.deleted.lock(), vec![vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(*client.commits.lock(), vec![CommitMode::Hard]);
    }

    #[test]
    fn test_delete_by_other_attribute_uses_found_ids() {
        let (store, client) = store();
        client.respond(1, vec![stored("id-7", "Harbor")]);

        let deleted = store
            .delete(vec!["Harbor".into()], Some("title"))
            .unwrap();

        assert_eq!(deleted.len(), 1);
        assert_eq!(*client.deleted.lock(), vec![vec!["id-7".to_string()]]);
        assert_eq!(*client.commits.lock(), vec![CommitMode::Hard]);
    }

    #[test]
    fn test_delete_commits_even_when_nothing_found() {
        let (store, client) = store();

        let deleted = store.delete(vec!["ghost".into()], Some("title")).unwrap();

        assert!(deleted.is_empty());
        assert!(client.deleted.lock().is_empty());
        assert_eq!(*client.commits.lock(), vec![CommitMode::Hard]);
    }

    #[test]
    fn test_delete_requires_key_attribute() {
        let (store, _client) = store();

        let err = store.delete(vec!["a".into()], Some(" ")).unwrap_err();

        assert_eq!(err.code(), "CAT-004");
    }

    #[test]
    fn test_delete_unknown_stored_record_type_is_ingest_failed() {
        let (store, client) = store();
        client.respond(
            1,
            vec![IndexDocument::new()
                .with("_record_type_", "mystery")
                .with("title_txt", "A")],
        );

        let err = store
            .delete(vec!["A".into()], Some("title"))
            .unwrap_err();

        assert_eq!(err.code(), "CAT-003");
        assert!(client.deleted.lock().is_empty());
    }

    // =========================================================================
    // Availability
    // =========================================================================

    #[test]
    fn test_is_available() {
        let (up, _) = store();
        let (down, _) = store_with(
            RecordingClient {
                down: true,
                ..RecordingClient::default()
            },
            StoreConfig::default(),
        );

        assert!(up.is_available());
        assert!(!down.is_available());
    }
}
