//! TOML-backed [`SessionStore`] that reads the whole file on open and rewrites it on every
//! mutation.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use toml::{Table, Value};
// self
use crate::{
	_prelude::*,
	store::{SessionStore, StoreError, StoreFuture, StoreKey, StoreValue},
};

/// Persists `(section, item)` entries as TOML tables after each mutation.
///
/// Entries this crate never touches (comments aside) are carried through rewrites unchanged.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Table>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Path of the backing TOML file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Table, StoreError> {
		if !path.exists() {
			return Ok(Table::new());
		}

		let text = fs::read_to_string(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		toml::from_str::<Table>(&text).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &Table) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = toml::to_string(contents).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize config snapshot: {e}"),
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("toml.tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(serialized.as_bytes()).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn lookup(table: &Table, key: &StoreKey) -> Result<Option<StoreValue>, StoreError> {
		let Some(section) = table.get(&*key.section) else {
			return Ok(None);
		};
		let section = section.as_table().ok_or_else(|| StoreError::Serialization {
			message: format!("Section `{}` is not a table", key.section),
		})?;

		section.get(&*key.item).map(|value| from_toml(key, value)).transpose()
	}

	fn apply(table: &mut Table, key: StoreKey, value: StoreValue) -> Result<(), StoreError> {
		let section = table
			.entry(key.section.to_string())
			.or_insert_with(|| Value::Table(Table::new()))
			.as_table_mut()
			.ok_or_else(|| StoreError::Serialization {
				message: format!("Section `{}` is not a table", key.section),
			})?;

		section.insert(key.item.to_string(), to_toml(value));

		Ok(())
	}
}
impl SessionStore for FileStore {
	fn fetch<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<StoreValue>> {
		Box::pin(async move { Self::lookup(&self.inner.read(), key) })
	}

	fn save_all(&self, entries: Vec<(StoreKey, StoreValue)>) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let mut next = guard.clone();

			for (key, value) in entries {
				Self::apply(&mut next, key, value)?;
			}

			self.persist_locked(&next)?;
			*guard = next;

			Ok(())
		})
	}
}

fn from_toml(key: &StoreKey, value: &Value) -> Result<StoreValue, StoreError> {
	match value {
		Value::String(text) => Ok(StoreValue::Text(text.clone())),
		Value::Float(number) => Ok(StoreValue::Float(*number)),
		Value::Integer(number) => Ok(StoreValue::Integer(*number)),
		Value::Boolean(flag) => Ok(StoreValue::Boolean(*flag)),
		other => Err(StoreError::Serialization {
			message: format!("Entry `{key}` holds an unsupported {} value", other.type_str()),
		}),
	}
}

fn to_toml(value: StoreValue) -> Value {
	match value {
		StoreValue::Text(text) => Value::String(text),
		StoreValue::Float(number) => Value::Float(number),
		StoreValue::Integer(number) => Value::Integer(number),
		StoreValue::Boolean(flag) => Value::Boolean(flag),
	}
}
