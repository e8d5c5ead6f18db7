use hamtrie::{Error, Trie};
use test_case::test_case;

// S1 -- basic dict.
#[test]
fn s1_basic_dict() {
    let t = Trie::new();
    t.insert(b"Hello", 123);
    t.insert(b"World", 456);
    assert_eq!(t.len(), 2);
    assert_eq!(t.get(b"Hello"), Some(123));

    t.delete(b"World").unwrap();
    assert_eq!(t.len(), 1);
    assert!(!t.has_node(b"World"));
}

// S2 -- staggered paths.
#[test]
fn s2_staggered_paths() {
    let t = Trie::new();
    t.insert(b"AB", 0);
    t.insert(b"ABCD", 1);
    t.insert(b"ABCDEFG", 2);
    t.insert(b"ABCDEFGHIJK", 3);

    t.delete(b"AB").unwrap();
    assert!(t.has_node(b"AB"));
    assert_eq!(t.get(b"AB"), None);
    assert_eq!(t.get(b"ABCD"), Some(1));
    assert_eq!(t.get(b"ABCDEFG"), Some(2));
    assert_eq!(t.get(b"ABCDEFGHIJK"), Some(3));

    t.delete(b"ABCDEFGHIJK").unwrap();
    assert!(!t.has_node(b"ABCDE"));
    assert_eq!(t.get(b"ABCD"), Some(1));
}

// S3 -- longest prefix.
#[test_case(b"f", None; "no match")]
#[test_case(b"fo", Some((b"fo".to_vec(), 1)); "exact short key")]
#[test_case(b"foobar", Some((b"foo".to_vec(), 2)); "longer lookup than any stored key")]
fn s3_longest_prefix_lookups(query: &[u8], expected: Option<(Vec<u8>, i32)>) {
    let t = Trie::new();
    t.insert(b"fo", 1);
    t.insert(b"foo", 2);
    assert_eq!(t.longest_prefix(query), expected);
}

#[test]
fn s3_longest_prefix() {
    let t = Trie::new();
    t.insert(b"fo", 1);
    t.insert(b"foo", 2);
    assert_eq!(t.longest_prefix(b"foobar"), Some((b"foo".to_vec(), 2)));

    t.insert(b"foobar", 3);
    assert_eq!(t.longest_prefix(b"foobar"), Some((b"foobar".to_vec(), 3)));

    t.delete(b"foo").unwrap();
    assert_eq!(t.longest_prefix(b"foozle"), Some((b"fo".to_vec(), 1)));
}

// S4 -- neighbors.
#[test]
fn s4_neighbors() {
    let t = Trie::new();
    t.insert(b"hello", 1);
    assert_eq!(t.neighbors(b"hello", 5).unwrap().count(), 0);

    t.insert(b"h3llo", 2);
    let hits: Vec<_> = t
        .neighbors(b"hello", 1)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(hits, vec![(1, b"h3llo".to_vec(), 2)]);
}

// S5 -- pairs on {A,B,C}^3.
#[test]
fn s5_pairs_on_cube() {
    let t = Trie::new();
    let mut n = 0;
    for &x in b"ABC" {
        for &y in b"ABC" {
            for &z in b"ABC" {
                t.insert(&[x, y, z], n);
                n += 1;
            }
        }
    }
    assert_eq!(t.pairs(3, 1).unwrap().count(), 81);
    assert_eq!(t.pairs(3, 2).unwrap().count(), 243);
    assert_eq!(t.pairs(3, 3).unwrap().count(), 351);
}

// S6 -- iterator invalidation.
#[test]
fn s6_iterator_invalidation_on_insert() {
    let t = Trie::new();
    t.insert(b"a", 1);
    t.insert(b"b", 2);
    t.insert(b"c", 3);

    let mut it = t.iter_keys();
    assert!(it.next().unwrap().is_ok());
    t.insert(b"d", 4);
    assert_eq!(it.next(), Some(Err(Error::StructuralChange)));
}

#[test]
fn s6_guard_is_generation_not_node_count() {
    let t = Trie::new();
    t.insert(b"a", 1);
    t.insert(b"b", 2);
    let nodes_before = t.num_nodes();

    let mut it = t.iter_keys();
    t.insert(b"c", 3);
    t.delete(b"c").unwrap();
    assert_eq!(t.num_nodes(), nodes_before);

    assert_eq!(it.next(), Some(Err(Error::StructuralChange)));
}

// S7 -- pairs concurrency.
#[test]
fn s7_pairs_concurrency() {
    let t = Trie::new();
    t.insert(b"hello", 1);
    t.insert(b"h3llo", 2);

    let mut i1 = t.pairs(5, 1).unwrap();
    let mut i2 = t.pairs(5, 1).unwrap();

    assert!(i1.next().unwrap().is_ok());
    assert_eq!(i2.next(), Some(Err(Error::ConcurrentUse)));
}
