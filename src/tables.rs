//! Table management RPC methods.
//!
//! Each method opens a catalog session for the caller, runs one catalog
//! operation, and returns plain serde records. All failures leave through
//! [`handle_rpc_errors`], so the caller always sees an [`RpcFault`](crate::RpcFault) with a
//! classified code, never a native error.
//!
//! The catalog and the metadata stores are collaborators behind traits; this
//! module only shapes requests and responses.
//!
//! Per-column display settings ([`ColumnMetadata`]) ride along with the
//! table methods under the `columns.metadata.*` names.

use crate::{handle_rpc_errors, ErrorIdentity, ErrorOrigin, Origin, RpcResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Default row limit for [`TablesRpc::get_import_preview`].
pub const DEFAULT_PREVIEW_LIMIT: u32 = 20;

/// Default search depth for [`TablesRpc::list_joinable`].
pub const DEFAULT_JOIN_DEPTH: u32 = 3;

/// Largest accepted fractional digit setting in [`FracDigits`].
pub const MAX_FRAC_DIGITS: u32 = 20;

// ============================================================================
// Records
// ============================================================================

/// Privilege the current role holds on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TablePrivilege {
    /// `SELECT` on the table.
    Select,
    /// `INSERT` into the table.
    Insert,
    /// `UPDATE` rows of the table.
    Update,
    /// `DELETE` rows from the table.
    Delete,
    /// `TRUNCATE` the table.
    Truncate,
    /// Create foreign keys referencing the table.
    References,
    /// Create triggers on the table.
    Trigger,
}

/// Information about a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table oid.
    pub oid: i64,
    /// Table name.
    pub name: String,
    /// Oid of the schema the table lives in.
    pub schema: i64,
    /// Table comment.
    pub description: Option<String>,
    /// Oid of the table's direct owner.
    pub owner_oid: i64,
    /// Privileges available to the current role.
    pub current_role_priv: Vec<TablePrivilege>,
    /// Whether the current role owns the table.
    pub current_role_owns: bool,
}

/// A newly created table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedTableInfo {
    /// Table oid.
    pub oid: i64,
    /// Table name.
    pub name: String,
}

/// Settable table fields for [`TablesRpc::patch`].
///
/// An absent field is left alone. For `description`, an explicit `null`
/// clears the comment; `null` for `name` or `columns` is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettableTableInfo {
    /// New table name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New comment; `Some(None)` clears it.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    /// Column alterations, passed to the catalog as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Value>>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// One table reachable from a base table through joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinableTableRecord {
    /// Oid of the table the paths start from.
    pub base: i64,
    /// Oid of the table the paths end at.
    pub target: i64,
    /// Column pairs `[[l_oid, l_attnum], [r_oid, r_attnum]]` per hop.
    pub join_path: Vec<Value>,
    /// `[constraint_id, reversed]` per hop.
    pub fkey_path: Vec<Value>,
    /// Number of hops.
    pub depth: u32,
    /// Whether the path can yield several rows per base row.
    pub multiple_results: bool,
}

/// Joinable tables from one base table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinableTableInfo {
    /// Reachable tables.
    pub joinable_tables: Vec<JoinableTableRecord>,
    /// Extra information about the target tables and their columns.
    pub target_table_info: Value,
}

/// UI metadata stored alongside a table, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Oid of the table the blob belongs to.
    pub table_oid: i64,
    /// The stored blob.
    pub blob: Value,
}

/// Table details joined with the table's metadata blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableWithMetadata {
    /// Table details.
    #[serde(flatten)]
    pub table: TableInfo,
    /// Metadata blob, `null` when none is stored.
    pub metadata: Option<Value>,
}

/// Arguments of [`TablesRpc::add`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTable {
    /// Table name; the catalog picks one when absent.
    #[serde(default)]
    pub table_name: Option<String>,
    /// Columns to create, in order.
    #[serde(default)]
    pub column_data_list: Vec<Value>,
    /// Constraints to create.
    #[serde(default)]
    pub constraint_data_list: Vec<Value>,
    /// Table comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Arguments of [`TablesRpc::import`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Id of the uploaded CSV/TSV data file.
    pub data_file_id: i64,
    /// Table name; the catalog picks one when absent.
    #[serde(default)]
    pub table_name: Option<String>,
    /// Table comment.
    #[serde(default)]
    pub comment: Option<String>,
}

// ============================================================================
// Column Metadata
// ============================================================================

/// Input widget for boolean columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolInput {
    /// A true/false dropdown.
    Dropdown,
    /// A single checkbox.
    Checkbox,
}

/// Placement of the currency symbol in money values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurrencyLocation {
    /// `-$1.00`
    #[default]
    AfterMinus,
    /// `-1.00 $`
    EndWithSpace,
}

/// Invalid column display settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMetadataError {
    /// A fractional digit bound above [`MAX_FRAC_DIGITS`].
    FracDigitsTooLarge {
        /// Offending field name.
        field: &'static str,
        /// Rejected value.
        value: u32,
    },
    /// Minimum fractional digits above the maximum.
    FracDigitsInverted {
        /// Requested minimum.
        min: u32,
        /// Requested maximum.
        max: u32,
    },
}

impl fmt::Display for ColumnMetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FracDigitsTooLarge { field, value } => {
                write!(f, "{field} is {value}, above the limit of {MAX_FRAC_DIGITS}")
            }
            Self::FracDigitsInverted { min, max } => write!(
                f,
                "num_min_frac_digits ({min}) exceeds num_max_frac_digits ({max})"
            ),
        }
    }
}

impl std::error::Error for ColumnMetadataError {}

impl ErrorOrigin for ColumnMetadataError {
    fn identity(&self) -> ErrorIdentity<'_> {
        ErrorIdentity::new("builtins", "ValueError")
    }

    fn origin_hint(&self) -> Option<Origin> {
        Some(Origin::Builtin)
    }
}

/// Fractional digit bounds for numeric display.
///
/// Each bound is at most [`MAX_FRAC_DIGITS`], and the minimum never exceeds
/// the maximum when both are set. Deserialization enforces the same rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FracDigitsFields")]
pub struct FracDigits {
    #[serde(rename = "num_min_frac_digits")]
    min: Option<u32>,
    #[serde(rename = "num_max_frac_digits")]
    max: Option<u32>,
}

impl FracDigits {
    /// Checked bounds.
    pub fn new(min: Option<u32>, max: Option<u32>) -> Result<Self, ColumnMetadataError> {
        for (field, value) in [("num_min_frac_digits", min), ("num_max_frac_digits", max)] {
            if let Some(value) = value.filter(|v| *v > MAX_FRAC_DIGITS) {
                return Err(ColumnMetadataError::FracDigitsTooLarge { field, value });
            }
        }
        match (min, max) {
            (Some(min), Some(max)) if min > max => {
                Err(ColumnMetadataError::FracDigitsInverted { min, max })
            }
            _ => Ok(Self { min, max }),
        }
    }

    /// Minimum fractional digits shown.
    #[inline]
    pub const fn min(&self) -> Option<u32> {
        self.min
    }

    /// Maximum fractional digits shown.
    #[inline]
    pub const fn max(&self) -> Option<u32> {
        self.max
    }
}

#[derive(Deserialize)]
struct FracDigitsFields {
    #[serde(default)]
    num_min_frac_digits: Option<u32>,
    #[serde(default)]
    num_max_frac_digits: Option<u32>,
}

impl TryFrom<FracDigitsFields> for FracDigits {
    type Error = ColumnMetadataError;

    fn try_from(fields: FracDigitsFields) -> Result<Self, Self::Error> {
        Self::new(fields.num_min_frac_digits, fields.num_max_frac_digits)
    }
}

fn default_bool_true() -> String {
    "True".to_owned()
}

fn default_bool_false() -> String {
    "False".to_owned()
}

fn default_currency_symbol() -> String {
    "$".to_owned()
}

fn default_true() -> bool {
    true
}

/// Display settings for one column.
///
/// Stored per `(database_id, table_oid, attnum)`; the database id is the
/// store's key, not part of the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Oid of the column's table.
    pub table_oid: i64,
    /// Column number within the table.
    pub attnum: i64,
    /// Widget for boolean input.
    #[serde(default)]
    pub bool_input: Option<BoolInput>,
    /// Label shown for `true`.
    #[serde(default = "default_bool_true")]
    pub bool_true: String,
    /// Label shown for `false`.
    #[serde(default = "default_bool_false")]
    pub bool_false: String,
    /// Fractional digit bounds for numbers.
    #[serde(flatten)]
    pub frac_digits: FracDigits,
    /// Show numbers as percentages.
    #[serde(default)]
    pub num_show_as_perc: bool,
    /// Currency symbol for money values.
    #[serde(default = "default_currency_symbol")]
    pub mon_currency_symbol: String,
    /// Currency symbol placement.
    #[serde(default)]
    pub mon_currency_location: CurrencyLocation,
    /// Time display format.
    #[serde(default)]
    pub time_format: Option<String>,
    /// Date display format.
    #[serde(default)]
    pub date_format: Option<String>,
    /// Smallest duration unit shown.
    #[serde(default)]
    pub duration_min: Option<String>,
    /// Largest duration unit shown.
    #[serde(default)]
    pub duration_max: Option<String>,
    /// Show unit labels on durations.
    #[serde(default = "default_true")]
    pub duration_show_units: bool,
}

impl ColumnMetadata {
    /// Default settings for a column.
    pub fn new(table_oid: i64, attnum: i64) -> Self {
        Self {
            table_oid,
            attnum,
            bool_input: None,
            bool_true: default_bool_true(),
            bool_false: default_bool_false(),
            frac_digits: FracDigits::default(),
            num_show_as_perc: false,
            mon_currency_symbol: default_currency_symbol(),
            mon_currency_location: CurrencyLocation::default(),
            time_format: None,
            date_format: None,
            duration_min: None,
            duration_max: None,
            duration_show_units: true,
        }
    }

    /// Replace the fractional digit bounds, rejecting invalid ones.
    pub fn with_frac_digits(
        mut self,
        min: Option<u32>,
        max: Option<u32>,
    ) -> Result<Self, ColumnMetadataError> {
        self.frac_digits = FracDigits::new(min, max)?;
        Ok(self)
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Opens catalog sessions on a user database.
pub trait Connector {
    /// Session type.
    type Session: TableCatalog<Error = Self::Error>;
    /// Connection and catalog failures.
    type Error: ErrorOrigin + fmt::Display;

    /// Connect to `database_id` as `user`.
    fn connect(&self, database_id: i64, user: &str) -> Result<Self::Session, Self::Error>;
}

/// Table operations on one open session.
pub trait TableCatalog {
    /// Catalog failures.
    type Error: ErrorOrigin + fmt::Display;

    /// Every table in the schema.
    fn table_info(&mut self, schema_oid: i64) -> Result<Vec<TableInfo>, Self::Error>;
    /// One table by oid.
    fn table(&mut self, table_oid: i64) -> Result<TableInfo, Self::Error>;
    /// Create a table in the schema.
    fn create_table(
        &mut self,
        schema_oid: i64,
        new_table: &NewTable,
    ) -> Result<AddedTableInfo, Self::Error>;
    /// Returns the dropped table's name.
    fn drop_table(&mut self, table_oid: i64, cascade: bool) -> Result<String, Self::Error>;
    /// Returns the altered table's name.
    fn alter_table(
        &mut self,
        table_oid: i64,
        changes: &SettableTableInfo,
    ) -> Result<String, Self::Error>;
    /// Create a table from an uploaded data file.
    fn import_csv(
        &mut self,
        schema_oid: i64,
        request: &ImportRequest,
    ) -> Result<AddedTableInfo, Self::Error>;
    /// Rows of a table as they would read with `columns` applied, at most `limit`.
    fn preview(
        &mut self,
        table_oid: i64,
        columns: &[Value],
        limit: u32,
    ) -> Result<Vec<Value>, Self::Error>;
    /// Tables reachable from the table by foreign key paths of at most `max_depth` links.
    fn joinable_tables(
        &mut self,
        table_oid: i64,
        max_depth: u32,
    ) -> Result<JoinableTableInfo, Self::Error>;
}

/// Read access to stored table metadata.
pub trait TableMetadataStore {
    /// Store failures.
    type Error: ErrorOrigin + fmt::Display;

    /// All metadata blobs for a database.
    fn list(&self, database_id: i64) -> Result<Vec<TableMetadata>, Self::Error>;

    /// The blob for one table, if stored.
    fn get(&self, table_oid: i64, database_id: i64) -> Result<Option<TableMetadata>, Self::Error>;
}

/// Stored column display settings, unique per
/// `(database_id, table_oid, attnum)`.
pub trait ColumnMetadataStore {
    /// Store failures.
    type Error: ErrorOrigin + fmt::Display;

    /// Settings for every configured column of a table.
    fn list(&self, database_id: i64, table_oid: i64) -> Result<Vec<ColumnMetadata>, Self::Error>;

    /// Settings for one column, if stored.
    fn get(
        &self,
        database_id: i64,
        table_oid: i64,
        attnum: i64,
    ) -> Result<Option<ColumnMetadata>, Self::Error>;

    /// Insert or replace settings, keyed by each record's table and column.
    fn set(&self, database_id: i64, records: &[ColumnMetadata]) -> Result<(), Self::Error>;
}

// ============================================================================
// RPC Methods
// ============================================================================

/// The `tables.*` RPC namespace.
#[derive(Debug)]
pub struct TablesRpc<C, M> {
    connector: C,
    metadata: M,
}

impl<C, M> TablesRpc<C, M>
where
    C: Connector,
    M: TableMetadataStore,
{
    /// Methods backed by `connector` and `metadata`.
    pub fn new(connector: C, metadata: M) -> Self {
        Self {
            connector,
            metadata,
        }
    }

    fn with_session<T>(
        &self,
        method: &'static str,
        user: &str,
        database_id: i64,
        op: impl FnOnce(&mut C::Session) -> Result<T, C::Error>,
    ) -> RpcResult<T> {
        handle_rpc_errors(method, || {
            let mut session = self.connector.connect(database_id, user)?;
            op(&mut session)
        })
    }

    /// `tables.list`: tables in a schema.
    pub fn list(
        &self,
        user: &str,
        database_id: i64,
        schema_oid: i64,
    ) -> RpcResult<Vec<TableInfo>> {
        self.with_session("tables.list", user, database_id, |s| s.table_info(schema_oid))
    }

    /// `tables.get`: one table.
    pub fn get(&self, user: &str, database_id: i64, table_oid: i64) -> RpcResult<TableInfo> {
        self.with_session("tables.get", user, database_id, |s| s.table(table_oid))
    }

    /// `tables.add`: create a table with a default id column.
    pub fn add(
        &self,
        user: &str,
        database_id: i64,
        schema_oid: i64,
        new_table: &NewTable,
    ) -> RpcResult<AddedTableInfo> {
        self.with_session("tables.add", user, database_id, |s| {
            s.create_table(schema_oid, new_table)
        })
    }

    /// `tables.delete`: drop a table, returning its name.
    pub fn delete(
        &self,
        user: &str,
        database_id: i64,
        table_oid: i64,
        cascade: bool,
    ) -> RpcResult<String> {
        self.with_session("tables.delete", user, database_id, |s| {
            s.drop_table(table_oid, cascade)
        })
    }

    /// `tables.patch`: alter a table, returning its (possibly new) name.
    pub fn patch(
        &self,
        user: &str,
        database_id: i64,
        table_oid: i64,
        changes: &SettableTableInfo,
    ) -> RpcResult<String> {
        self.with_session("tables.patch", user, database_id, |s| {
            s.alter_table(table_oid, changes)
        })
    }

    /// `tables.import`: load an uploaded CSV/TSV into a new table.
    pub fn import(
        &self,
        user: &str,
        database_id: i64,
        schema_oid: i64,
        request: &ImportRequest,
    ) -> RpcResult<AddedTableInfo> {
        self.with_session("tables.import", user, database_id, |s| {
            s.import_csv(schema_oid, request)
        })
    }

    /// `tables.get_import_preview`: rows of an imported table with column
    /// casts applied. `limit` defaults to [`DEFAULT_PREVIEW_LIMIT`].
    pub fn get_import_preview(
        &self,
        user: &str,
        database_id: i64,
        table_oid: i64,
        columns: &[Value],
        limit: Option<u32>,
    ) -> RpcResult<Vec<Value>> {
        let limit = limit.unwrap_or(DEFAULT_PREVIEW_LIMIT);
        self.with_session("tables.get_import_preview", user, database_id, |s| {
            s.preview(table_oid, columns, limit)
        })
    }

    /// `tables.list_joinable`: tables reachable by joins.
    /// `max_depth` defaults to [`DEFAULT_JOIN_DEPTH`].
    pub fn list_joinable(
        &self,
        user: &str,
        database_id: i64,
        table_oid: i64,
        max_depth: Option<u32>,
    ) -> RpcResult<JoinableTableInfo> {
        let max_depth = max_depth.unwrap_or(DEFAULT_JOIN_DEPTH);
        self.with_session("tables.list_joinable", user, database_id, |s| {
            s.joinable_tables(table_oid, max_depth)
        })
    }

    /// `tables.list_with_metadata`: tables in a schema, each with its
    /// metadata blob or `null`.
    pub fn list_with_metadata(
        &self,
        user: &str,
        database_id: i64,
        schema_oid: i64,
    ) -> RpcResult<Vec<TableWithMetadata>> {
        const METHOD: &str = "tables.list_with_metadata";
        let tables = self.with_session(METHOD, user, database_id, |s| s.table_info(schema_oid))?;
        let records = handle_rpc_errors(METHOD, || self.metadata.list(database_id))?;

        let mut blobs: HashMap<i64, Value> =
            records.into_iter().map(|m| (m.table_oid, m.blob)).collect();
        Ok(tables
            .into_iter()
            .map(|table| TableWithMetadata {
                metadata: blobs.remove(&table.oid),
                table,
            })
            .collect())
    }

    /// `tables.get_with_metadata`: one table with its metadata blob.
    pub fn get_with_metadata(
        &self,
        user: &str,
        database_id: i64,
        table_oid: i64,
    ) -> RpcResult<TableWithMetadata> {
        const METHOD: &str = "tables.get_with_metadata";
        let table = self.with_session(METHOD, user, database_id, |s| s.table(table_oid))?;
        let stored = handle_rpc_errors(METHOD, || self.metadata.get(table_oid, database_id))?;
        Ok(TableWithMetadata {
            table,
            metadata: stored.map(|m| m.blob),
        })
    }
}

/// The `columns.metadata.*` RPC namespace.
#[derive(Debug)]
pub struct ColumnMetadataRpc<S> {
    store: S,
}

impl<S: ColumnMetadataStore> ColumnMetadataRpc<S> {
    /// Methods backed by `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// `columns.metadata.list`: settings for the columns of a table.
    pub fn list(&self, database_id: i64, table_oid: i64) -> RpcResult<Vec<ColumnMetadata>> {
        handle_rpc_errors("columns.metadata.list", || {
            self.store.list(database_id, table_oid)
        })
    }

    /// `columns.metadata.set`: store settings for some columns.
    pub fn set(&self, database_id: i64, records: &[ColumnMetadata]) -> RpcResult<()> {
        handle_rpc_errors("columns.metadata.set", || self.store.set(database_id, records))
    }

    /// `columns.metadata.set` from raw JSON records, rejecting invalid
    /// settings with a classified fault before the store is touched.
    pub fn set_from_json(&self, database_id: i64, records: Value) -> RpcResult<()> {
        let records: Vec<ColumnMetadata> = handle_rpc_errors("columns.metadata.set", || {
            serde_json::from_value(records).map_err(JsonError)
        })?;
        self.set(database_id, &records)
    }
}

/// Malformed request payload.
struct JsonError(serde_json::Error);

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ErrorOrigin for JsonError {
    fn identity(&self) -> ErrorIdentity<'_> {
        ErrorIdentity::new("builtins", "ValueError")
    }

    fn origin_hint(&self) -> Option<Origin> {
        Some(Origin::Builtin)
    }
}
