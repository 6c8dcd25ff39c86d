#![allow(missing_docs)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use refcode::graph::Archiver;
use refcode::reader::Value;
use refcode::{Archive, Bytes, Primitive, Refcode, RefcodeError, RefcodeObject, Unarchive};

#[derive(Default, RefcodeObject)]
struct Node {
    label: String,
    next: Option<Rc<RefCell<Node>>>,
}

#[derive(Default, RefcodeObject)]
struct Pair {
    left: Option<Rc<RefCell<Node>>>,
    right: Option<Rc<RefCell<Node>>>,
    first_name: String,
    second_name: String,
}

#[derive(Debug, Default, RefcodeObject)]
struct Wide {
    label: String,
    count: u32,
}

#[derive(Default, RefcodeObject)]
struct Narrow {
    label: String,
}

fn node(label: &str) -> Rc<RefCell<Node>> {
    Rc::new(RefCell::new(Node {
        label: label.to_owned(),
        next: None,
    }))
}

fn next_of(n: &Rc<RefCell<Node>>) -> Option<Rc<RefCell<Node>>> {
    n.borrow().next.clone()
}

// Breaks cycles so the test does not leak.
fn unlink(n: &Rc<RefCell<Node>>) {
    n.borrow_mut().next = None;
}

// --- TESTS ---

/// `a.next = a` serializes finitely and comes back pointing at itself.
#[test]
fn test_self_cycle() -> refcode::Result<()> {
    let a = node("self");
    a.borrow_mut().next = Some(a.clone());

    let bytes = Refcode::to_vec(&a)?;
    let back: Rc<RefCell<Node>> = Refcode::from_slice(&bytes)?;

    let next = next_of(&back).ok_or(RefcodeError::EmptyInput)?;
    assert!(Rc::ptr_eq(&next, &back));
    assert_eq!(back.borrow().label, "self");

    unlink(&a);
    unlink(&back);
    Ok(())
}

/// Two objects referencing each other keep the mutual relationship.
#[test]
fn test_mutual_cycle() -> refcode::Result<()> {
    let a = node("a");
    let b = node("b");
    a.borrow_mut().next = Some(b.clone());
    b.borrow_mut().next = Some(a.clone());

    let bytes = Refcode::to_vec(&a)?;
    let back_a: Rc<RefCell<Node>> = Refcode::from_slice(&bytes)?;
    let back_b = next_of(&back_a).ok_or(RefcodeError::EmptyInput)?;
    let again = next_of(&back_b).ok_or(RefcodeError::EmptyInput)?;

    assert_eq!(back_b.borrow().label, "b");
    assert!(Rc::ptr_eq(&again, &back_a));
    assert!(!Rc::ptr_eq(&back_a, &back_b));

    unlink(&a);
    unlink(&back_a);
    Ok(())
}

/// A shared object and a repeated string are each written once, and the
/// object sharing is visible after reading.
#[test]
fn test_deduplication() -> refcode::Result<()> {
    let shared = node("shared");
    let pair = Rc::new(RefCell::new(Pair {
        left: Some(shared.clone()),
        right: Some(shared.clone()),
        first_name: "repeated".into(),
        second_name: "repeated".into(),
    }));

    let bytes = Refcode::to_vec(&pair)?;
    let report = Refcode::inspect(&bytes)?;
    // Keys and values: the four field names, "label", "next", "shared",
    // "repeated" once.
    assert_eq!(report.count("string"), 8);
    // The pair and the shared node.
    assert_eq!(report.count("map"), 2);
    assert_eq!(report.count("nil"), 1);

    let back: Rc<RefCell<Pair>> = Refcode::from_slice(&bytes)?;
    let back = back.borrow();
    let left = back.left.clone().ok_or(RefcodeError::EmptyInput)?;
    let right = back.right.clone().ok_or(RefcodeError::EmptyInput)?;
    assert!(Rc::ptr_eq(&left, &right));
    assert_eq!(left.borrow().label, "shared");
    assert_eq!(back.first_name, back.second_name);
    Ok(())
}

/// Distinct objects with equal content stay distinct.
#[test]
fn test_equal_objects_are_not_merged() -> refcode::Result<()> {
    let nodes = vec![node("same"), node("same")];
    let bytes = Refcode::to_vec(&nodes)?;
    let back: Vec<Rc<RefCell<Node>>> = Refcode::from_slice(&bytes)?;
    assert_eq!(back.len(), 2);
    assert!(!Rc::ptr_eq(&back[0], &back[1]));
    assert_eq!(back[0].borrow().label, back[1].borrow().label);
    Ok(())
}

/// A missing required key names the type and the key.
#[test]
fn test_missing_key() -> refcode::Result<()> {
    let narrow = Rc::new(RefCell::new(Narrow {
        label: "only a label".into(),
    }));
    let bytes = Refcode::to_vec(&narrow)?;
    let result = Refcode::from_slice::<Rc<RefCell<Wide>>>(&bytes);
    match result {
        Err(RefcodeError::MapFailed { type_name, key }) => {
            assert!(type_name.ends_with("Wide"), "{type_name}");
            assert_eq!(key, "count");
        }
        other => panic!("expected MapFailed, got {other:?}"),
    }
    Ok(())
}

/// Reading a field with the wrong shape is an `IncorrectType`.
#[test]
fn test_incorrect_type() -> refcode::Result<()> {
    let bytes = Refcode::to_vec("not a number")?;
    assert!(matches!(
        Refcode::from_slice::<u32>(&bytes),
        Err(RefcodeError::IncorrectType { found: "string", .. })
    ));

    let bytes = Refcode::to_vec(&300u32)?;
    assert!(matches!(
        Refcode::from_slice::<u8>(&bytes),
        Err(RefcodeError::ConversionFailed { target: "u8", .. })
    ));
    assert_eq!(Refcode::from_slice::<i64>(&bytes)?, 300);
    Ok(())
}

/// Standard containers round-trip through their element types.
#[test]
fn test_std_containers() -> refcode::Result<()> {
    let mut scores = HashMap::new();
    scores.insert("alice".to_string(), vec![1i32, -2, 300]);
    scores.insert("bob".to_string(), vec![]);
    let bytes = Refcode::to_vec(&scores)?;
    let back: HashMap<String, Vec<i32>> = Refcode::from_slice(&bytes)?;
    assert_eq!(back, scores);

    let mut ordered = BTreeMap::new();
    ordered.insert(3u8, Some(Bytes(vec![1, 2, 3])));
    ordered.insert(1u8, None);
    let bytes = Refcode::to_vec(&ordered)?;
    let back: BTreeMap<u8, Option<Bytes>> = Refcode::from_slice(&bytes)?;
    assert_eq!(back, ordered);

    let floats = vec![0.5f32, -1.25];
    let bytes = Refcode::to_vec(&floats)?;
    let back: Vec<f32> = Refcode::from_slice(&bytes)?;
    assert_eq!(back, floats);
    Ok(())
}

/// Box and unit pass through.
#[test]
fn test_boxed_values() -> refcode::Result<()> {
    let boxed: Box<Option<String>> = Box::new(Some("inside".to_string()));
    let bytes = Refcode::to_vec(&boxed)?;
    let back: Box<Option<String>> = Refcode::from_slice(&bytes)?;
    assert_eq!(back, boxed);

    let bytes = Refcode::to_vec(&())?;
    Refcode::from_slice::<()>(&bytes)?;
    let none: Option<u8> = Refcode::from_slice(&bytes)?;
    assert_eq!(none, None);
    Ok(())
}

/// A hand-written value type using the whole-value accessors.
#[derive(Clone, Debug, PartialEq)]
struct Rgb(u8, u8, u8);

impl Archive for Rgb {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.data(&[self.0, self.1, self.2]);
    }
}

impl Unarchive for Rgb {
    fn unarchive(value: &mut Value<'_, '_>) -> refcode::Result<Self> {
        match value.data()? {
            [r, g, b] => Ok(Rgb(*r, *g, *b)),
            other => Err(RefcodeError::ConversionFailed {
                value: format!("{} bytes", other.len()),
                target: "Rgb",
            }),
        }
    }
}

#[test]
fn test_custom_value_type() -> refcode::Result<()> {
    let palette = vec![Rgb(255, 0, 0), Rgb(0, 128, 255)];
    let bytes = Refcode::to_vec(&palette)?;
    let back: Vec<Rgb> = Refcode::from_slice(&bytes)?;
    assert_eq!(back, palette);
    Ok(())
}

/// Deep graphs stop at the configured depth instead of overflowing the stack.
#[test]
fn test_depth_limit() -> refcode::Result<()> {
    let head = node("0");
    let mut tail = head.clone();
    for i in 1..50 {
        let n = node(&i.to_string());
        tail.borrow_mut().next = Some(n.clone());
        tail = n;
    }

    let options = Refcode::builder().max_depth(20);
    assert!(matches!(
        options.to_vec(&head),
        Err(RefcodeError::DepthLimitExceeded(20))
    ));

    let bytes = Refcode::to_vec(&head)?;
    assert!(matches!(
        options.from_slice::<Rc<RefCell<Node>>>(&bytes),
        Err(RefcodeError::DepthLimitExceeded(20))
    ));

    let back: Rc<RefCell<Node>> = Refcode::from_slice(&bytes)?;
    let mut cursor = Some(back);
    let mut count = 0;
    while let Some(n) = cursor {
        count += 1;
        cursor = next_of(&n);
    }
    assert_eq!(count, 50);
    Ok(())
}

/// A reference past the end of the table is reported, not followed.
#[test]
fn test_dangling_reference() {
    let bytes = [0x81, 0x05];
    assert!(matches!(
        Refcode::from_slice::<i32>(&bytes),
        Err(RefcodeError::DanglingReference { reference: 5, len: 2 })
    ));
}

/// A reference that points at itself cannot loop forever.
#[test]
fn test_reference_loop() {
    let bytes = [0x00];
    assert!(matches!(
        Refcode::from_slice::<i32>(&bytes),
        Err(RefcodeError::DepthLimitExceeded(_))
    ));
}

/// The raw primitive table of a small graph, in stream order.
#[test]
fn test_stream_layout() -> refcode::Result<()> {
    let shared = "s".to_string();
    let values = vec![shared.clone(), shared];
    let bytes = Refcode::to_vec(&values)?;
    let table = Refcode::builder().decode_table(&bytes[..])?;
    // Slot 0 (root) is last and references slot 1 ("s"), written first.
    assert_eq!(
        table,
        vec![
            Primitive::from("s"),
            Primitive::Array(vec![Primitive::Reference(0), Primitive::Reference(0)]),
        ]
    );
    Ok(())
}
