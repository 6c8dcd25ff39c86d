#![allow(missing_docs)]

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use refcode::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH};
use refcode::{Refcode, RefcodeError, RefcodeObject, RefcodeOptions};
use serde::de::value::{Error as ValueError, MapDeserializer};
use serde::Deserialize;

#[derive(Default, RefcodeObject)]
struct Level {
    id: u32,
    name: String,
    tiles: Vec<u8>,
    parent: Option<Rc<RefCell<Level>>>,
}

fn create_level() -> Rc<RefCell<Level>> {
    let world = Rc::new(RefCell::new(Level {
        id: 1,
        name: "World".into(),
        tiles: vec![],
        parent: None,
    }));
    Rc::new(RefCell::new(Level {
        id: 42,
        name: "Dungeon_01".into(),
        tiles: (0..200).map(|i| (i % 7) as u8).collect(),
        parent: Some(world),
    }))
}

fn assert_level(level: &Rc<RefCell<Level>>) {
    let level = level.borrow();
    assert_eq!(level.id, 42);
    assert_eq!(level.name, "Dungeon_01");
    assert_eq!(level.tiles.len(), 200);
    assert_eq!(level.tiles[13], 6);
    let parent = level.parent.as_ref().map(|p| p.borrow().name.clone());
    assert_eq!(parent.as_deref(), Some("World"));
}

// --- TESTS ---

/// Standard File IO
/// Validate `Refcode::save` and the memory-mapped `Refcode::load`.
#[test]
#[cfg(not(target_arch = "wasm32"))]
fn test_standard_file_io() -> refcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("level.rfc");

    Refcode::save(&file_path, &create_level())?;
    let loaded: Rc<RefCell<Level>> = Refcode::load(&file_path)?;

    assert_level(&loaded);
    Ok(())
}

/// Writer and reader IO
/// Validate `Refcode::serialize` and `Refcode::deserialize` over any `Write`/`Read`.
#[test]
fn test_stream_io() -> refcode::Result<()> {
    let mut buffer = Vec::new();
    Refcode::serialize(&mut buffer, &create_level())?;
    assert!(!buffer.is_empty());

    let loaded: Rc<RefCell<Level>> = Refcode::deserialize(Cursor::new(buffer))?;
    assert_level(&loaded);
    Ok(())
}

/// Tiny buffers change nothing but the number of I/O calls.
#[test]
fn test_buffer_size() -> refcode::Result<()> {
    let options = Refcode::builder().buffer_size(1);
    let bytes = options.to_vec(&create_level())?;
    assert_eq!(bytes, Refcode::to_vec(&create_level())?);

    let loaded: Rc<RefCell<Level>> = options.from_slice(&bytes)?;
    assert_level(&loaded);
    Ok(())
}

/// The two phases can be driven separately.
#[test]
fn test_graph_and_table_phases() -> refcode::Result<()> {
    let options = RefcodeOptions::default();
    let graph = options.build_graph(&create_level())?;
    let slot_count = graph.len();

    let table = graph.into_stream_order();
    assert_eq!(table.len(), slot_count);
    let loaded: Rc<RefCell<Level>> = options.reconstruct(&table)?;
    assert_level(&loaded);
    Ok(())
}

/// Empty files are valid to open but hold no root.
#[test]
#[cfg(not(target_arch = "wasm32"))]
fn test_empty_file() -> refcode::Result<()> {
    let file = tempfile::NamedTempFile::new()?;
    let result = Refcode::load::<u32, _>(file.path());
    assert!(matches!(result, Err(RefcodeError::EmptyInput)));
    Ok(())
}

/// IO failures surface as `RefcodeError::Io`.
#[test]
#[cfg(not(target_arch = "wasm32"))]
fn test_missing_file() -> refcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let result = Refcode::load::<u32, _>(dir.path().join("absent.rfc"));
    match result {
        Err(RefcodeError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected an IO error, got {other:?}"),
    }
    Ok(())
}

/// The inspector describes the stream without rebuilding it.
#[test]
fn test_inspect() -> refcode::Result<()> {
    let bytes = Refcode::to_vec(&create_level())?;
    let report = Refcode::inspect(&bytes)?;

    assert_eq!(report.byte_length, bytes.len() as u64);
    assert_eq!(report.root_kind, "map");
    assert_eq!(report.slot_count, report.slots.len());
    assert_eq!(report.count("map"), 2);

    let root = report.root().ok_or(RefcodeError::EmptyInput)?;
    assert_eq!(root.logical_id, 0);
    assert_eq!(root.position, report.slot_count - 1);
    assert!(root.summary.contains('@'), "{}", root.summary);
    Ok(())
}

/// Scalar options load from any serde source; missing fields keep defaults.
#[test]
fn test_options_from_serde() -> refcode::Result<()> {
    let source = MapDeserializer::<_, ValueError>::new([("max_depth", 32usize)].into_iter());
    let options = <RefcodeOptions as Deserialize>::deserialize(source).map_err(|e| RefcodeError::Internal(e.to_string()))?;
    assert_eq!(options.max_depth, 32);
    assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);
    assert!(!options.type_registry().contains::<u32>("anything"));

    let defaults = Refcode::builder();
    assert_eq!(defaults.max_depth, DEFAULT_MAX_DEPTH);
    Ok(())
}
