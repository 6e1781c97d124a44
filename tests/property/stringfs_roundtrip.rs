//! Property tests for packed filesystem images.
//!
//! Encoding a random tree and decoding it yields the same shape and the
//! same file bytes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use proptest::prelude::*;

use bytespool::stringfs::{encode_dir, StringFs};

#[derive(Clone, Debug)]
enum Node {
    File(Vec<u8>),
    Dir(BTreeMap<String, Node>),
}

fn node_strategy() -> impl Strategy<Value = Node> {
    let leaf = prop::collection::vec(any::<u8>(), 0..64).prop_map(Node::File);
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-z0-9_]{1,8}", inner, 0..4).prop_map(Node::Dir)
    })
}

fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, Node>> {
    prop::collection::btree_map("[a-z0-9_]{1,8}", node_strategy(), 0..5)
}

fn materialize(dir: &Path, entries: &BTreeMap<String, Node>) {
    for (name, node) in entries {
        let path = dir.join(name);
        match node {
            Node::File(bytes) => fs::write(&path, bytes).unwrap(),
            Node::Dir(children) => {
                fs::create_dir(&path).unwrap();
                materialize(&path, children);
            }
        }
    }
}

fn check(packed: &StringFs<'_>, path: &str, entries: &BTreeMap<String, Node>) {
    let dir = packed.open(path).unwrap();
    assert!(dir.is_dir());
    let names = dir.readdir_names().unwrap();
    let expected: Vec<&str> = entries.keys().map(String::as_str).collect();
    assert_eq!(names, expected, "children of {path}");

    for (name, node) in entries {
        let child = format!("{path}/{name}");
        match node {
            Node::File(bytes) => {
                let file = packed.open(&child).unwrap();
                assert_eq!(file.contents().unwrap(), bytes.as_slice(), "{child}");
            }
            Node::Dir(children) => check(packed, &child, children),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn decode_inverts_encode(tree in tree_strategy()) {
        let tmp = tempfile::tempdir().unwrap();
        materialize(tmp.path(), &tree);

        let image = encode_dir(tmp.path()).unwrap();
        let packed = StringFs::decode(&image).unwrap();
        check(&packed, "", &tree);
    }
}
