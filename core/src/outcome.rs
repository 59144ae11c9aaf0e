use crate::response::Response;

/// What a single dispatch rule decided about the request.
#[derive(Debug)]
pub enum Outcome {
    /// The rule produced the final response; later rules don't run.
    Respond(Response),

    /// The rule let the request through, possibly after rewriting its target
    /// or command.
    Forward,
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::Respond(response)
    }
}
