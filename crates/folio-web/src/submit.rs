//! Contact form POST.

use anyhow::anyhow;
use folio_core::{SubmitOutcome, SubmitRequest};
use gloo_net::http::Request;
use tracing::debug;
use wasm_bindgen::JsCast;
use web_sys::{Element, FormData, HtmlFormElement};

use crate::page::describe;

/// Snapshot the form's fields.
pub fn form_data(form: &Element) -> anyhow::Result<FormData> {
    let form = form
        .dyn_ref::<HtmlFormElement>()
        .ok_or_else(|| anyhow!("contact form is not a <form>"))?;
    FormData::new_with_form(form).map_err(|err| anyhow!("FormData: {}", describe(&err)))
}

async fn post(request: &SubmitRequest, body: FormData) -> anyhow::Result<u16> {
    let response = Request::post(&request.action)
        .header("Accept", request.accept)
        .body(body)
        .map_err(|err| anyhow!("building contact request: {err}"))?
        .send()
        .await
        .map_err(|err| anyhow!("sending contact request: {err}"))?;
    Ok(response.status())
}

/// Send the form and report how it went. Transport failures become
/// [`SubmitOutcome::NetworkError`].
pub async fn send(request: SubmitRequest, body: FormData) -> SubmitOutcome {
    match post(&request, body).await {
        Ok(status) => {
            debug!(status, action = %request.action, "contact form answered");
            SubmitOutcome::Status(status)
        }
        Err(err) => SubmitOutcome::NetworkError(format!("{err:#}")),
    }
}
