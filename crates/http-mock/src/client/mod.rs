//! Test-side access to a running mock server.

mod facade;
mod requests;
mod transport;

pub use facade::{Collaborator, HttpMock};
pub use requests::RequestCollection;
pub use transport::{MockClient, RawResponse, Transport};
