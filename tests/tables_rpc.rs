//! Integration tests for the `tables.*` RPC methods
//!
//! The catalog and metadata store are in-memory fakes whose failures look
//! like the errors a real backend raises.

use rpc_error_codes::{
    AddedTableInfo, BoolInput, ColumnMetadata, ColumnMetadataRpc, ColumnMetadataStore,
    Connector, ForeignError, ImportRequest, JoinableTableInfo, JoinableTableRecord, NewTable,
    Origin, SettableTableInfo, TableCatalog, TableInfo, TableMetadata, TableMetadataStore,
    TablePrivilege, TablesRpc, DEFAULT_JOIN_DEPTH, DEFAULT_PREVIEW_LIMIT, MAX_FRAC_DIGITS,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

const DB: i64 = 1;
const SCHEMA: i64 = 2200;

// ============================================================================
// FAKE COLLABORATORS
// ============================================================================

fn table(oid: i64, name: &str) -> TableInfo {
    TableInfo {
        oid,
        name: name.to_string(),
        schema: SCHEMA,
        description: None,
        owner_oid: 10,
        current_role_priv: vec![TablePrivilege::Select, TablePrivilege::Insert],
        current_role_owns: true,
    }
}

struct FakeConnector {
    tables: Vec<TableInfo>,
}

impl Connector for FakeConnector {
    type Session = FakeSession;
    type Error = ForeignError;

    fn connect(&self, _database_id: i64, user: &str) -> Result<FakeSession, ForeignError> {
        if user == "anonymous" {
            return Err(ForeignError::new(
                "django.core.exceptions",
                "PermissionDenied",
                "login required",
            ));
        }
        Ok(FakeSession {
            tables: self.tables.clone(),
        })
    }
}

struct FakeSession {
    tables: Vec<TableInfo>,
}

impl FakeSession {
    fn find(&self, oid: i64) -> Result<&TableInfo, ForeignError> {
        self.tables.iter().find(|t| t.oid == oid).ok_or_else(|| {
            ForeignError::new(
                "psycopg.errors",
                "UndefinedTable",
                format!("relation with OID {oid} does not exist"),
            )
        })
    }
}

impl TableCatalog for FakeSession {
    type Error = ForeignError;

    fn table_info(&mut self, schema_oid: i64) -> Result<Vec<TableInfo>, ForeignError> {
        Ok(self
            .tables
            .iter()
            .filter(|t| t.schema == schema_oid)
            .cloned()
            .collect())
    }

    fn table(&mut self, table_oid: i64) -> Result<TableInfo, ForeignError> {
        self.find(table_oid).cloned()
    }

    fn create_table(
        &mut self,
        _schema_oid: i64,
        new_table: &NewTable,
    ) -> Result<AddedTableInfo, ForeignError> {
        let name = new_table.table_name.clone().unwrap_or_else(|| "Table 1".into());
        if self.tables.iter().any(|t| t.name == name) {
            return Err(ForeignError::new(
                "psycopg.errors",
                "DuplicateTable",
                format!("relation \"{name}\" already exists"),
            ));
        }
        Ok(AddedTableInfo { oid: 9000, name })
    }

    fn drop_table(&mut self, table_oid: i64, cascade: bool) -> Result<String, ForeignError> {
        let name = self.find(table_oid)?.name.clone();
        if !cascade && name == "authors" {
            return Err(ForeignError::new(
                "psycopg.errors",
                "DependentObjectsStillExist",
                "other objects depend on it",
            ));
        }
        Ok(name)
    }

    fn alter_table(
        &mut self,
        table_oid: i64,
        changes: &SettableTableInfo,
    ) -> Result<String, ForeignError> {
        let current = self.find(table_oid)?;
        match &changes.name {
            Some(name) if name.is_empty() => Err(ForeignError::new(
                "mathesar.api.exceptions",
                "InvalidTableName",
                "table name cannot be empty",
            )),
            Some(name) => Ok(name.clone()),
            None => Ok(current.name.clone()),
        }
    }

    fn import_csv(
        &mut self,
        _schema_oid: i64,
        request: &ImportRequest,
    ) -> Result<AddedTableInfo, ForeignError> {
        if request.data_file_id <= 0 {
            return Err(ForeignError::new("builtins", "FileNotFoundError", "no data file"));
        }
        Ok(AddedTableInfo {
            oid: 9001,
            name: request.table_name.clone().unwrap_or_else(|| "import".into()),
        })
    }

    fn preview(
        &mut self,
        table_oid: i64,
        _columns: &[Value],
        limit: u32,
    ) -> Result<Vec<Value>, ForeignError> {
        self.find(table_oid)?;
        Ok((0..limit).map(|i| json!({ "id": i })).collect())
    }

    fn joinable_tables(
        &mut self,
        table_oid: i64,
        max_depth: u32,
    ) -> Result<JoinableTableInfo, ForeignError> {
        self.find(table_oid)?;
        Ok(JoinableTableInfo {
            joinable_tables: vec![JoinableTableRecord {
                base: table_oid,
                target: 2255,
                join_path: vec![json!([[table_oid, 3], [2255, 1]])],
                fkey_path: vec![json!([12345, false])],
                depth: max_depth,
                multiple_results: false,
            }],
            target_table_info: json!({}),
        })
    }
}

struct FakeMetadata {
    records: Vec<TableMetadata>,
    broken: bool,
}

impl FakeMetadata {
    fn check(&self) -> Result<(), ForeignError> {
        if self.broken {
            return Err(ForeignError::new(
                "django.db.utils",
                "OperationalError",
                "no such table: mathesar_tablemetadata",
            ));
        }
        Ok(())
    }
}

impl TableMetadataStore for FakeMetadata {
    type Error = ForeignError;

    fn list(&self, _database_id: i64) -> Result<Vec<TableMetadata>, ForeignError> {
        self.check()?;
        Ok(self.records.clone())
    }

    fn get(&self, table_oid: i64, _database_id: i64) -> Result<Option<TableMetadata>, ForeignError> {
        self.check()?;
        Ok(self.records.iter().find(|m| m.table_oid == table_oid).cloned())
    }
}

fn rpc() -> TablesRpc<FakeConnector, FakeMetadata> {
    rpc_with_metadata(false)
}

fn rpc_with_metadata(broken: bool) -> TablesRpc<FakeConnector, FakeMetadata> {
    TablesRpc::new(
        FakeConnector {
            tables: vec![table(2254, "authors"), table(2255, "books")],
        },
        FakeMetadata {
            records: vec![TableMetadata {
                table_oid: 2254,
                blob: json!({ "import_verified": true, "column_order": [1, 2, 3] }),
            }],
            broken,
        },
    )
}

// ============================================================================
// SUCCESS PATHS
// ============================================================================

#[test]
fn list_returns_schema_tables() {
    let tables = rpc().list("alice", DB, SCHEMA).unwrap();
    let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["authors", "books"]);
}

#[test]
fn get_returns_one_table() {
    assert_eq!(rpc().get("alice", DB, 2255).unwrap().name, "books");
}

#[test]
fn add_uses_requested_name() {
    let new_table = NewTable {
        table_name: Some("reviews".into()),
        ..NewTable::default()
    };
    let added = rpc().add("alice", DB, SCHEMA, &new_table).unwrap();
    assert_eq!(added, AddedTableInfo { oid: 9000, name: "reviews".into() });
}

#[test]
fn delete_with_cascade_returns_name() {
    assert_eq!(rpc().delete("alice", DB, 2254, true).unwrap(), "authors");
}

#[test]
fn patch_without_name_keeps_name() {
    let changes = SettableTableInfo {
        description: Some(None),
        ..SettableTableInfo::default()
    };
    assert_eq!(rpc().patch("alice", DB, 2255, &changes).unwrap(), "books");
}

#[test]
fn import_creates_table() {
    let request = ImportRequest {
        data_file_id: 7,
        table_name: Some("patrons".into()),
        comment: None,
    };
    assert_eq!(rpc().import("alice", DB, SCHEMA, &request).unwrap().name, "patrons");
}

#[test]
fn preview_limit_defaults_to_twenty() {
    let rows = rpc().get_import_preview("alice", DB, 2254, &[], None).unwrap();
    assert_eq!(rows.len(), DEFAULT_PREVIEW_LIMIT as usize);
    assert_eq!(DEFAULT_PREVIEW_LIMIT, 20);

    let rows = rpc().get_import_preview("alice", DB, 2254, &[], Some(5)).unwrap();
    assert_eq!(rows.len(), 5);
}

#[test]
fn joinable_depth_defaults_to_three() {
    let info = rpc().list_joinable("alice", DB, 2254, None).unwrap();
    assert_eq!(info.joinable_tables[0].depth, DEFAULT_JOIN_DEPTH);
    assert_eq!(DEFAULT_JOIN_DEPTH, 3);

    let info = rpc().list_joinable("alice", DB, 2254, Some(1)).unwrap();
    assert_eq!(info.joinable_tables[0].depth, 1);
}

#[test]
fn list_with_metadata_attaches_blobs() {
    let rows = rpc().list_with_metadata("alice", DB, SCHEMA).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].metadata.as_ref().unwrap()["import_verified"], true);
    assert!(rows[1].metadata.is_none());

    let wire = serde_json::to_value(&rows[1]).unwrap();
    assert_eq!(wire["name"], "books");
    assert!(wire["metadata"].is_null());
}

#[test]
fn get_with_metadata_attaches_blob() {
    let row = rpc().get_with_metadata("alice", DB, 2254).unwrap();
    assert_eq!(row.table.name, "authors");
    assert_eq!(row.metadata.unwrap()["column_order"], json!([1, 2, 3]));
}

// ============================================================================
// FAULT PATHS
// ============================================================================

#[test]
fn missing_table_is_driver_fault() {
    let fault = rpc().get("alice", DB, 1).unwrap_err();
    assert_eq!(fault.code(), -30259);
    assert_eq!(fault.origin(), Origin::Driver);
    assert_eq!(fault.method(), Some("tables.get"));
    assert_eq!(
        fault.message(),
        "UndefinedTable: relation with OID 1 does not exist"
    );
}

#[test]
fn connect_failure_is_framework_fault() {
    let fault = rpc().list("anonymous", DB, SCHEMA).unwrap_err();
    assert_eq!(fault.code(), -29074);
    assert_eq!(fault.method(), Some("tables.list"));
}

#[test]
fn duplicate_table_is_classified() {
    let new_table = NewTable {
        table_name: Some("books".into()),
        ..NewTable::default()
    };
    assert_eq!(rpc().add("alice", DB, SCHEMA, &new_table).unwrap_err().code(), -30050);
}

#[test]
fn dependents_block_plain_delete() {
    let fault = rpc().delete("alice", DB, 2254, false).unwrap_err();
    assert_eq!(fault.origin(), Origin::Driver);
    assert_eq!(fault.code(), -30035);
}

#[test]
fn application_error_keeps_application_code() {
    let changes = SettableTableInfo {
        name: Some(String::new()),
        ..SettableTableInfo::default()
    };
    let fault = rpc().patch("alice", DB, 2254, &changes).unwrap_err();
    assert_eq!(fault.code(), -28019);
}

#[test]
fn import_without_file_is_builtin_fault() {
    let request = ImportRequest {
        data_file_id: 0,
        table_name: None,
        comment: None,
    };
    let fault = rpc().import("alice", DB, SCHEMA, &request).unwrap_err();
    assert_eq!(fault.code(), -31016);
    assert_eq!(fault.method(), Some("tables.import"));
}

#[test]
fn metadata_failure_surfaces_as_fault() {
    let fault = rpc_with_metadata(true)
        .list_with_metadata("alice", DB, SCHEMA)
        .unwrap_err();
    assert_eq!(fault.code(), -29072);
    assert_eq!(fault.method(), Some("tables.list_with_metadata"));

    let fault = rpc_with_metadata(true)
        .get_with_metadata("alice", DB, 2254)
        .unwrap_err();
    assert_eq!(fault.method(), Some("tables.get_with_metadata"));
}

#[test]
fn fault_wire_form_is_code_and_message() {
    let fault = rpc().get("alice", DB, 1).unwrap_err();
    assert_eq!(
        serde_json::to_value(&fault).unwrap(),
        json!({
            "code": -30259,
            "message": "UndefinedTable: relation with OID 1 does not exist"
        })
    );
}

// ============================================================================
// COLUMN METADATA
// ============================================================================

#[derive(Default)]
struct FakeColumnStore {
    rows: Mutex<BTreeMap<(i64, i64, i64), ColumnMetadata>>,
    read_only: bool,
}

impl ColumnMetadataStore for FakeColumnStore {
    type Error = ForeignError;

    fn list(&self, database_id: i64, table_oid: i64) -> Result<Vec<ColumnMetadata>, ForeignError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|((db, oid, _), _)| *db == database_id && *oid == table_oid)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn get(
        &self,
        database_id: i64,
        table_oid: i64,
        attnum: i64,
    ) -> Result<Option<ColumnMetadata>, ForeignError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&(database_id, table_oid, attnum)).cloned())
    }

    fn set(&self, database_id: i64, records: &[ColumnMetadata]) -> Result<(), ForeignError> {
        if self.read_only {
            return Err(ForeignError::new(
                "django.db.utils",
                "OperationalError",
                "attempt to write a readonly database",
            ));
        }
        let mut rows = self.rows.lock().unwrap();
        for record in records {
            rows.insert((database_id, record.table_oid, record.attnum), record.clone());
        }
        Ok(())
    }
}

#[test]
fn column_metadata_set_replaces_per_column() {
    let rpc = ColumnMetadataRpc::new(FakeColumnStore::default());
    let first = ColumnMetadata::new(2254, 2);
    let second = ColumnMetadata {
        bool_input: Some(BoolInput::Dropdown),
        ..ColumnMetadata::new(2254, 3)
    };
    rpc.set(DB, &[first.clone(), second]).unwrap();

    let updated = ColumnMetadata::new(2254, 3)
        .with_frac_digits(Some(0), Some(MAX_FRAC_DIGITS))
        .unwrap();
    rpc.set(DB, &[updated.clone()]).unwrap();

    assert_eq!(rpc.list(DB, 2254).unwrap(), vec![first, updated]);
    assert!(rpc.list(DB + 1, 2254).unwrap().is_empty());
}

#[test]
fn column_metadata_store_is_keyed_by_database_table_and_column() {
    let store = FakeColumnStore::default();
    store.set(DB, &[ColumnMetadata::new(2254, 2)]).unwrap();
    store.set(DB + 1, &[ColumnMetadata::new(2254, 2)]).unwrap();

    assert!(store.get(DB, 2254, 2).unwrap().is_some());
    assert!(store.get(DB, 2254, 3).unwrap().is_none());
    assert!(store.get(DB, 2255, 2).unwrap().is_none());
    assert_eq!(store.rows.lock().unwrap().len(), 2);
}

#[test]
fn invalid_column_metadata_is_rejected_before_the_store() {
    let rpc = ColumnMetadataRpc::new(FakeColumnStore::default());
    let fault = rpc
        .set_from_json(
            DB,
            json!([{ "table_oid": 2254, "attnum": 2, "num_max_frac_digits": 21 }]),
        )
        .unwrap_err();

    assert_eq!(fault.code(), -31057);
    assert_eq!(fault.origin(), Origin::Builtin);
    assert!(fault.message().starts_with("ValueError: num_max_frac_digits is 21"));
    assert_eq!(fault.method(), Some("columns.metadata.set"));
    assert!(rpc.list(DB, 2254).unwrap().is_empty());
}

#[test]
fn valid_json_column_metadata_is_stored() {
    let rpc = ColumnMetadataRpc::new(FakeColumnStore::default());
    rpc.set_from_json(
        DB,
        json!([{ "table_oid": 2254, "attnum": 2, "num_min_frac_digits": 20, "num_max_frac_digits": 20 }]),
    )
    .unwrap();

    let stored = rpc.list(DB, 2254).unwrap();
    assert_eq!(stored[0].frac_digits.max(), Some(20));
    assert_eq!(stored[0].mon_currency_symbol, "$");
}

#[test]
fn column_metadata_store_failure_is_framework_fault() {
    let rpc = ColumnMetadataRpc::new(FakeColumnStore {
        read_only: true,
        ..FakeColumnStore::default()
    });
    let fault = rpc.set(DB, &[ColumnMetadata::new(2254, 2)]).unwrap_err();
    assert_eq!(fault.code(), -29072);
    assert_eq!(fault.method(), Some("columns.metadata.set"));
}

// ============================================================================
// LOGGING
// ============================================================================

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<(Level, i64)>>>);

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = CodeVisitor(None);
        event.record(&mut visitor);
        if let Some(code) = visitor.0 {
            self.0.lock().unwrap().push((*event.metadata().level(), code));
        }
    }
}

struct CodeVisitor(Option<i64>);

impl Visit for CodeVisitor {
    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "code" {
            self.0 = Some(value);
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
}

#[test]
fn faults_are_logged_by_origin() {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());

    tracing::subscriber::with_default(subscriber, || {
        let _ = rpc().get("alice", DB, 1);
        let changes = SettableTableInfo {
            name: Some(String::new()),
            ..SettableTableInfo::default()
        };
        let _ = rpc().patch("alice", DB, 2254, &changes);
        let _ = rpc().list("alice", DB, SCHEMA);
    });

    let events = captured.0.lock().unwrap().clone();
    assert_eq!(events, vec![(Level::WARN, -30259), (Level::DEBUG, -28019)]);
}
