use crate::utils::{BoundedList, is_pchar, is_query_char, percent_decode, percent_encode};

#[test]
fn test_pchar_classification() {
    for byte in [b'a', b'Z', b'0', b'-', b'.', b'_', b'~', b'!', b'=', b':', b'@'] {
        assert!(is_pchar(byte), "{:?} should be a pchar", char::from(byte));
    }
    for byte in [b'/', b'?', b'#', b'%', b' ', b'[', b']'] {
        assert!(!is_pchar(byte), "{:?} should not be a pchar", char::from(byte));
    }
    assert!(is_query_char(b'/'));
    assert!(is_query_char(b'?'));
    assert!(!is_query_char(b'#'));
}

#[test]
fn test_percent_decode_fast_path() {
    assert_eq!(percent_decode("rd", is_pchar).expect("should decode"), "rd");
    assert_eq!(percent_decode("", is_pchar).expect("should decode"), "");
    assert!(percent_decode("r d", is_pchar).is_err());
}

#[test]
fn test_percent_decode_escapes() {
    assert_eq!(
        percent_decode("%41%20x", is_pchar).expect("should decode"),
        "A x"
    );
    assert!(percent_decode("%zz", is_pchar).is_err());
    assert!(percent_decode("a%4", is_pchar).is_err());
    assert!(percent_decode("a%", is_pchar).is_err());
}

#[test]
fn test_percent_decode_rejects_invalid_utf8() {
    let error = percent_decode("%FF", is_pchar).expect_err("raw 0xff is not UTF-8");
    assert!(format!("{error:?}").contains("UTF-8"));
}

#[test]
fn test_percent_encode() {
    assert_eq!(percent_encode("a b/", is_pchar), "a%20b%2F");
    assert_eq!(percent_encode("x=1", is_query_char), "x=1");
    assert_eq!(percent_encode("100%", is_pchar), "100%25");
}

#[test]
fn test_bounded_list_cap() {
    let mut list = BoundedList::new(2);
    list.push("a".to_string()).expect("fits");
    list.push("b".to_string()).expect("fits");
    assert!(list.push("c".to_string()).is_err());
    assert_eq!(list.len(), 2);
    assert_eq!(list.into_inner(), vec!["a", "b"]);

    let empty = BoundedList::new(4);
    assert!(empty.is_empty());
}
