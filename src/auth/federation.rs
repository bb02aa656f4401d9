//! Read-only client metadata lookup (OpenID Connect Registration `ClientMetadata` subset).

// self
use crate::_prelude::*;

/// Display metadata for a relying party.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMetadata {
	/// OAuth 2.0 client identifier.
	pub id: String,
	/// Human-readable client name.
	pub display_name: String,
	/// Icon shown next to the client name.
	pub icon_uri: Option<Url>,
}
impl ClientMetadata {
	/// Creates a metadata record.
	pub fn new(
		id: impl Into<String>,
		display_name: impl Into<String>,
		icon_uri: Option<Url>,
	) -> Self {
		Self { id: id.into(), display_name: display_name.into(), icon_uri }
	}

	/// Metadata shown for clients the registry does not know.
	pub fn placeholder(client_id: &str) -> Self {
		Self {
			id: client_id.to_owned(),
			display_name: format!("Unknown client ({client_id})"),
			icon_uri: None,
		}
	}
}

/// Lookup contract from client identifier to display metadata.
///
/// Lookups are pure and infallible: a miss is reported as `None`, never as an error.
pub trait ClientMetadataRegistry
where
	Self: Send + Sync,
{
	/// Returns the metadata registered for `client_id`, if any.
	fn lookup(&self, client_id: &str) -> Option<ClientMetadata>;
}

/// Registry backed by an in-process table populated at construction.
#[derive(Clone, Debug, Default)]
pub struct StaticClientRegistry(Arc<HashMap<String, ClientMetadata>>);
impl StaticClientRegistry {
	/// Number of registered clients.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when no clients are registered.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl FromIterator<ClientMetadata> for StaticClientRegistry {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = ClientMetadata>,
	{
		Self(Arc::new(iter.into_iter().map(|metadata| (metadata.id.clone(), metadata)).collect()))
	}
}
impl ClientMetadataRegistry for StaticClientRegistry {
	fn lookup(&self, client_id: &str) -> Option<ClientMetadata> {
		self.0.get(client_id).cloned()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn lookup_is_exact_and_misses_are_none() {
		let registry = StaticClientRegistry::from_iter([ClientMetadata::new(
			"aua.example",
			"Aua",
			None,
		)]);

		assert_eq!(registry.len(), 1);
		assert_eq!(registry.lookup("aua.example").map(|m| m.display_name), Some("Aua".into()));
		assert!(registry.lookup("AUA.EXAMPLE").is_none());
		assert!(StaticClientRegistry::default().lookup("aua.example").is_none());
	}

	#[test]
	fn placeholder_names_the_client() {
		let placeholder = ClientMetadata::placeholder("mystery");

		assert_eq!(placeholder.id, "mystery");
		assert!(placeholder.display_name.contains("mystery"));
		assert!(placeholder.icon_uri.is_none());
	}
}
