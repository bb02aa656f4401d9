//! Minimal HTML scraping for identity-provider login pages.
//!
//! Only two questions are ever asked of a page: where does the form with a given id submit
//! to, and what does the provider's error element say. Parsed documents never outlive the
//! call that parsed them.

// crates.io
use scraper::{ElementRef, Html};
// self
use crate::_prelude::*;

/// Message returned when a page carries no readable error element.
pub const UNKNOWN_PROVIDER_ERROR: &str = "Unknown identity provider error";

const CHALLENGE_INPUT_NAMES: [&str; 2] = ["challenge", "challenge_data"];

/// Form target extracted from a provider page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtmlForm {
	/// Absolute submission URL.
	pub action_url: Url,
	/// Server-issued challenge carried in a hidden input, if any.
	pub challenge_context: Option<String>,
}

/// Errors raised while extracting a form.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum FormParseError {
	/// No element carries the requested id.
	#[error("Element `{id}` is absent.")]
	MissingElement {
		/// Requested element id.
		id: String,
	},
	/// The element has no `action` attribute.
	#[error("Element `{id}` has no action attribute.")]
	MissingAction {
		/// Requested element id.
		id: String,
	},
	/// The action cannot be resolved against the page URL.
	#[error("Element `{id}` has an unresolvable action `{action}`.")]
	InvalidAction {
		/// Requested element id.
		id: String,
		/// Raw action attribute value.
		action: String,
	},
}
impl From<FormParseError> for Error {
	fn from(e: FormParseError) -> Self {
		let form_id = match e {
			FormParseError::MissingElement { id }
			| FormParseError::MissingAction { id }
			| FormParseError::InvalidAction { id, .. } => id,
		};

		Error::FormParse { form_id }
	}
}

/// Locates the element `form_id` in `body` and resolves its `action` against `page_url`.
pub fn extract_form(
	body: &[u8],
	page_url: &Url,
	form_id: &str,
) -> Result<HtmlForm, FormParseError> {
	let document = parse(body);
	let form = element_by_id(&document, form_id)
		.ok_or_else(|| FormParseError::MissingElement { id: form_id.to_owned() })?;

	form_from_element(form, page_url, form_id)
}

/// Extracts the first of `form_ids` present in `body`, returning its id alongside the form.
///
/// When none of the ids is present the error names the first one.
pub fn extract_first_form<'i>(
	body: &[u8],
	page_url: &Url,
	form_ids: &[&'i str],
) -> Result<(&'i str, HtmlForm), FormParseError> {
	let document = parse(body);

	for id in form_ids {
		if let Some(form) = element_by_id(&document, id) {
			return form_from_element(form, page_url, id).map(|form| (*id, form));
		}
	}

	let id = form_ids.first().copied().unwrap_or_default().to_owned();

	Err(FormParseError::MissingElement { id })
}

/// Returns the whitespace-normalized text of `element_id`, or [`UNKNOWN_PROVIDER_ERROR`].
///
/// Never fails: arbitrary bytes, including non-HTML or non-UTF-8 input, yield the fallback.
pub fn extract_error_message(body: &[u8], element_id: &str) -> String {
	let document = parse(body);

	element_by_id(&document, element_id)
		.map(|el| el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
		.filter(|text| !text.is_empty())
		.unwrap_or_else(|| UNKNOWN_PROVIDER_ERROR.to_owned())
}

fn form_from_element(
	form: ElementRef<'_>,
	page_url: &Url,
	form_id: &str,
) -> Result<HtmlForm, FormParseError> {
	let action = form
		.value()
		.attr("action")
		.map(str::trim)
		.filter(|action| !action.is_empty())
		.ok_or_else(|| FormParseError::MissingAction { id: form_id.to_owned() })?;
	let action_url = page_url.join(action).map_err(|_| FormParseError::InvalidAction {
		id: form_id.to_owned(),
		action: action.to_owned(),
	})?;
	let challenge_context = form
		.descendants()
		.filter_map(ElementRef::wrap)
		.filter(|el| el.value().name() == "input")
		.find(|el| {
			el.value().attr("name").is_some_and(|name| CHALLENGE_INPUT_NAMES.contains(&name))
		})
		.and_then(|el| el.value().attr("value"))
		.map(str::to_owned);

	Ok(HtmlForm { action_url, challenge_context })
}

fn parse(body: &[u8]) -> Html {
	Html::parse_document(&String::from_utf8_lossy(body))
}

fn element_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
	document
		.root_element()
		.descendants()
		.filter_map(ElementRef::wrap)
		.find(|el| el.value().id() == Some(id))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn page_url() -> Url {
		Url::parse("https://id.example/auth/realms/health/login-actions/authenticate?x=1")
			.expect("Page URL fixture should parse.")
	}

	#[test]
	fn relative_actions_resolve_against_the_page() {
		let body = br#"<html><body><form id="kc-totp-login-form" action="/totp" method="post">
			<input type="hidden" name="challenge" value="nonce-1"></form></body></html>"#;
		let form = extract_form(body, &page_url(), "kc-totp-login-form")
			.expect("Form with an action should be extracted.");

		assert_eq!(form.action_url.as_str(), "https://id.example/totp");
		assert_eq!(form.challenge_context.as_deref(), Some("nonce-1"));
	}

	#[test]
	fn absolute_actions_are_kept() {
		let body =
			br#"<form id="kc-form-login" action="https://other.example/login?session=9"></form>"#;
		let form = extract_form(body, &page_url(), "kc-form-login").expect("Form should be found.");

		assert_eq!(form.action_url.as_str(), "https://other.example/login?session=9");
		assert!(form.challenge_context.is_none());
	}

	#[test]
	fn missing_forms_and_actions_are_errors() {
		let body = br#"<form id="kc-form-login"></form>"#;

		assert_eq!(
			extract_form(body, &page_url(), "kc-totp-login-form"),
			Err(FormParseError::MissingElement { id: "kc-totp-login-form".into() })
		);
		assert_eq!(
			extract_form(body, &page_url(), "kc-form-login"),
			Err(FormParseError::MissingAction { id: "kc-form-login".into() })
		);
		assert!(matches!(
			Error::from(FormParseError::MissingAction { id: "kc-form-login".into() }),
			Error::FormParse { form_id } if form_id == "kc-form-login"
		));
	}

	#[test]
	fn error_message_text_is_normalized() {
		let body = br#"<div id="kc-error-message">
			<span>Invalid</span>   client
		</div>"#;

		assert_eq!(extract_error_message(body, "kc-error-message"), "Invalid client");
		assert_eq!(
			extract_error_message(
				br#"<div id="kc-error-message">Invalid client</div>"#,
				"kc-error-message",
			),
			"Invalid client"
		);
	}

	#[test]
	fn error_message_falls_back_deterministically() {
		let garbage = [0xff_u8, 0xfe, 0x00, b'<', 0x80, b'{', b'"'];
		let first = extract_error_message(&garbage, "kc-error-message");

		assert_eq!(first, UNKNOWN_PROVIDER_ERROR);

		for _ in 0..3 {
			assert_eq!(extract_error_message(&garbage, "kc-error-message"), first);
		}

		assert_eq!(extract_error_message(b"", "kc-error-message"), UNKNOWN_PROVIDER_ERROR);
		assert_eq!(
			extract_error_message(br#"<div id="kc-error-message">  </div>"#, "kc-error-message"),
			UNKNOWN_PROVIDER_ERROR
		);
	}

	#[test]
	fn first_present_form_wins() {
		let login = br#"<form id="kc-form-login" action="/login"></form>"#;
		let ids = ["kc-totp-login-form", "kc-form-login"];
		let (id, form) =
			extract_first_form(login, &page_url(), &ids).expect("Login form should be found.");

		assert_eq!(id, "kc-form-login");
		assert_eq!(form.action_url.as_str(), "https://id.example/login");
		assert_eq!(
			extract_first_form(b"{\"endpoint\":\"x\"}", &page_url(), &ids),
			Err(FormParseError::MissingElement { id: "kc-totp-login-form".into() })
		);
	}
}
