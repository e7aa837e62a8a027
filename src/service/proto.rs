// ============================================================================
// KeyValueStore wire messages
// ============================================================================
//
// Mirrors the `KeyValueStore` protobuf service. Laid out the way the tonic
// codegen emits messages so a generated server can use them directly.
//
// ============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRequest {
    #[prost(string, tag = "1")]
    pub key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetResponse {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateRequest {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CreateResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateRequest {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct UpdateResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteRequest {
    #[prost(string, tag = "1")]
    pub key: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DeleteResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetHistoryRequest {
    #[prost(string, tag = "1")]
    pub key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetHistoryResponse {
    #[prost(message, repeated, tag = "1")]
    pub events: Vec<get_history_response::Event>,
}

/// Nested message and enum types in `GetHistoryResponse`.
pub mod get_history_response {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Event {
        #[prost(string, tag = "1")]
        pub op: String,
        #[prost(message, optional, tag = "2")]
        pub item: Option<event::Item>,
    }

    /// Nested message and enum types in `Event`.
    pub mod event {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Item {
            #[prost(string, tag = "1")]
            pub key: String,
            #[prost(string, tag = "2")]
            pub value: String,
        }
    }
}
