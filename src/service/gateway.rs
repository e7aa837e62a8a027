use tonic::{Code, Status};

// ============================================================================
// HTTP transcoding boundary
// ============================================================================
//
// Status rules applied where RPC statuses are turned into HTTP responses.
// A duplicate create is the client's fault, so AlreadyExists leaves the
// boundary as InvalidArgument (400) rather than 409.
//
// ============================================================================

/// Remap an RPC status before it crosses into HTTP
pub fn gateway_status(status: Status) -> Status {
    match status.code() {
        Code::AlreadyExists => Status::new(Code::InvalidArgument, status.message().to_string()),
        _ => status,
    }
}

/// HTTP status code for an RPC status code
pub fn http_status(code: Code) -> u16 {
    match code {
        Code::Ok => 200,
        Code::Cancelled => 499,
        Code::Unknown => 500,
        Code::InvalidArgument => 400,
        Code::DeadlineExceeded => 504,
        Code::NotFound => 404,
        Code::AlreadyExists => 409,
        Code::PermissionDenied => 403,
        Code::ResourceExhausted => 429,
        Code::FailedPrecondition => 400,
        Code::Aborted => 409,
        Code::OutOfRange => 400,
        Code::Unimplemented => 501,
        Code::Internal => 500,
        Code::Unavailable => 503,
        Code::DataLoss => 500,
        Code::Unauthenticated => 401,
        #[allow(unreachable_patterns)]
        _ => 500,
    }
}
