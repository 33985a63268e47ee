use crate::request::StandardRequest;
use crate::sink::ResponseWriter;

/// Request handler driven by the dispatcher, once per gateway event.
///
/// Everything the handler wants to send goes through `response`; stage
/// variables arrive on the request rather than in the process environment.
pub trait Handler {
    fn handle(&self, request: &StandardRequest, response: &mut dyn ResponseWriter);
}

impl<F> Handler for F
where
    F: Fn(&StandardRequest, &mut dyn ResponseWriter),
{
    fn handle(&self, request: &StandardRequest, response: &mut dyn ResponseWriter) {
        self(request, response);
    }
}
