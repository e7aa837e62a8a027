use std::sync::Arc;
use tonic::{Code, Request, Response, Status};

use crate::domain::kv::KvError;
use crate::event_sourcing::{EventLog, EventLogStore, StoreError};
use super::proto::{
    get_history_response, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse,
    GetHistoryRequest, GetHistoryResponse, GetRequest, GetResponse, UpdateRequest, UpdateResponse,
};

// ============================================================================
// KeyValueStore RPC service
// ============================================================================
//
// Thin shim: request -> store call -> response or status. Faults become a
// failed request; they never take the process down.
//
// ============================================================================

/// Page size of GetHistory responses
pub const HISTORY_PAGE_SIZE: usize = 20;

pub struct KeyValueServer<L: EventLog> {
    store: Arc<EventLogStore<L>>,
}

impl<L: EventLog> KeyValueServer<L> {
    pub fn new(store: Arc<EventLogStore<L>>) -> Self {
        Self { store }
    }

    pub async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let req = request.into_inner();
        let key = require_key(req.key)?;

        let value = self.store.get(&key).await.map_err(to_status)?;

        Ok(Response::new(GetResponse { key, value }))
    }

    pub async fn create(
        &self,
        request: Request<CreateRequest>,
    ) -> Result<Response<CreateResponse>, Status> {
        let req = request.into_inner();
        let key = require_key(req.key)?;

        self.store.create(&key, &req.value).await.map_err(to_status)?;

        Ok(Response::new(CreateResponse {}))
    }

    pub async fn update(
        &self,
        request: Request<UpdateRequest>,
    ) -> Result<Response<UpdateResponse>, Status> {
        let req = request.into_inner();
        let key = require_key(req.key)?;

        self.store.update(&key, &req.value).await.map_err(to_status)?;

        Ok(Response::new(UpdateResponse {}))
    }

    pub async fn delete(
        &self,
        request: Request<DeleteRequest>,
    ) -> Result<Response<DeleteResponse>, Status> {
        let req = request.into_inner();
        let key = require_key(req.key)?;

        self.store.delete(&key).await.map_err(to_status)?;

        Ok(Response::new(DeleteResponse {}))
    }

    pub async fn get_history(
        &self,
        request: Request<GetHistoryRequest>,
    ) -> Result<Response<GetHistoryResponse>, Status> {
        let req = request.into_inner();
        let key = require_key(req.key)?;

        let history = self
            .store
            .get_history(&key, HISTORY_PAGE_SIZE)
            .await
            .map_err(to_status)?;

        let events = history
            .into_iter()
            .map(|event| get_history_response::Event {
                op: event.operation.to_string(),
                item: Some(get_history_response::event::Item {
                    key: event.key,
                    value: event.value,
                }),
            })
            .collect();

        Ok(Response::new(GetHistoryResponse { events }))
    }
}

fn require_key(key: String) -> Result<String, Status> {
    if key.is_empty() {
        return Err(Status::invalid_argument("key must not be empty"));
    }
    Ok(key)
}

/// Map a store outcome onto the RPC status model
pub fn to_status(err: StoreError) -> Status {
    match err {
        StoreError::Rejected(KvError::NotFound) => Status::new(Code::NotFound, KvError::NotFound.to_string()),
        StoreError::Rejected(KvError::AlreadyExists) => {
            Status::new(Code::AlreadyExists, KvError::AlreadyExists.to_string())
        }
        StoreError::Unavailable => Status::unavailable(err.to_string()),
        StoreError::Storage(_) | StoreError::ConflictRetriesExhausted { .. } => {
            tracing::error!(error = %err, "Request failed with storage fault");
            Status::internal("internal storage error")
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::{LogError, MemoryEventLog};

    fn server() -> KeyValueServer<MemoryEventLog> {
        KeyValueServer::new(Arc::new(EventLogStore::new(Arc::new(MemoryEventLog::new()))))
    }

    fn create_req(key: &str, value: &str) -> Request<CreateRequest> {
        Request::new(CreateRequest { key: key.to_string(), value: value.to_string() })
    }

    fn get_req(key: &str) -> Request<GetRequest> {
        Request::new(GetRequest { key: key.to_string() })
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let server = server();

        server.create(create_req("1", "2")).await.unwrap();
        let resp = server.get(get_req("1")).await.unwrap().into_inner();

        assert_eq!(resp, GetResponse { key: "1".to_string(), value: "2".to_string() });
    }

    #[tokio::test]
    async fn test_duplicate_create_is_already_exists() {
        let server = server();

        server.create(create_req("1", "2")).await.unwrap();
        let status = server.create(create_req("1", "3")).await.unwrap_err();

        assert_eq!(status.code(), Code::AlreadyExists);
        assert_eq!(status.message(), "Key already exists");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let server = server();

        let get = server.get(get_req("nope")).await.unwrap_err();
        let update = server
            .update(Request::new(UpdateRequest { key: "nope".into(), value: "v".into() }))
            .await
            .unwrap_err();
        let delete = server
            .delete(Request::new(DeleteRequest { key: "nope".into() }))
            .await
            .unwrap_err();

        for status in [get, update, delete] {
            assert_eq!(status.code(), Code::NotFound);
            assert_eq!(status.message(), "Key not found");
        }
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let server = server();

        let status = server.create(create_req("", "v")).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_history_tuples() {
        let server = server();

        server.create(create_req("1", "1")).await.unwrap();
        server
            .update(Request::new(UpdateRequest { key: "1".into(), value: "2".into() }))
            .await
            .unwrap();
        server
            .delete(Request::new(DeleteRequest { key: "1".into() }))
            .await
            .unwrap();

        let resp = server
            .get_history(Request::new(GetHistoryRequest { key: "1".into() }))
            .await
            .unwrap()
            .into_inner();

        let tuples: Vec<(String, String, String)> = resp
            .events
            .into_iter()
            .map(|e| {
                let item = e.item.unwrap();
                (e.op, item.key, item.value)
            })
            .collect();

        assert_eq!(
            tuples,
            vec![
                ("delete".to_string(), "1".to_string(), "2".to_string()),
                ("update".to_string(), "1".to_string(), "2".to_string()),
                ("create".to_string(), "1".to_string(), "1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_history_is_one_page() {
        let server = server();

        server.create(create_req("k", "0")).await.unwrap();
        for i in 1..30 {
            server
                .update(Request::new(UpdateRequest { key: "k".into(), value: i.to_string() }))
                .await
                .unwrap();
        }

        let resp = server
            .get_history(Request::new(GetHistoryRequest { key: "k".into() }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(resp.events.len(), HISTORY_PAGE_SIZE);
        assert_eq!(resp.events[0].item.as_ref().unwrap().value, "29");
    }

    #[test]
    fn test_faults_map_to_internal() {
        let status = to_status(StoreError::Storage(LogError::backend("decode failure")));
        assert_eq!(status.code(), Code::Internal);
        assert!(!status.message().contains("decode failure"));

        let status = to_status(StoreError::ConflictRetriesExhausted { key: "k".into(), attempts: 20 });
        assert_eq!(status.code(), Code::Internal);

        assert_eq!(to_status(StoreError::Unavailable).code(), Code::Unavailable);
    }
}
