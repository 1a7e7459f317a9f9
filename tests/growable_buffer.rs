use kestrel_billboards::growable::{GrowableBuffer, MIN_CAPACITY};
use kestrel_billboards::BufferError;

fn filled(values: &[u32]) -> GrowableBuffer<u32> {
    let mut buffer = GrowableBuffer::with_capacity(values.len());
    buffer.extend_from_slice(values);
    buffer
}

#[test]
fn removing_every_other_record_preserves_order() {
    let mut buffer = filled(&(0..10).collect::<Vec<_>>());
    let mut index = 0;
    while index < buffer.len() {
        buffer.remove_at(index).expect("index in range");
        index += 1;
    }
    assert_eq!(buffer.as_slice(), &[1, 3, 5, 7, 9]);
}

#[test]
fn push_grows_past_capacity_without_losing_contents() {
    let mut buffer = GrowableBuffer::<u32>::with_capacity(MIN_CAPACITY);
    for value in 0..9 {
        buffer.push(value);
    }
    assert_eq!(buffer.len(), 9);
    assert!(buffer.capacity() >= 9);
    assert_eq!(buffer.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn resize_keeps_existing_records() {
    let mut buffer = filled(&[4, 5, 6]);
    buffer.set_capacity(32);
    assert_eq!(buffer.capacity(), 32);
    assert_eq!(buffer.as_slice(), &[4, 5, 6]);
}

#[test]
fn clear_keeps_capacity() {
    let mut buffer = GrowableBuffer::<u32>::with_capacity(16);
    buffer.extend_from_slice(&[1, 2, 3]);
    buffer.clear();
    assert!(buffer.is_empty());
    assert_eq!(buffer.capacity(), 16);
}

#[test]
fn insert_and_insert_slice_shift_tail() {
    let mut buffer = filled(&[1, 4]);
    buffer.insert(1, 2).unwrap();
    buffer.insert_slice(2, &[3, 3]).unwrap();
    buffer.insert(buffer.len(), 5).unwrap();
    assert_eq!(buffer.as_slice(), &[1, 2, 3, 3, 4, 5]);
}

#[test]
fn insert_past_end_is_rejected() {
    let mut buffer = filled(&[1, 2]);
    assert_eq!(buffer.insert(3, 9), Err(BufferError::InsertPastEnd { index: 3, len: 2 }));
    assert_eq!(buffer.insert_slice(5, &[9]), Err(BufferError::InsertPastEnd { index: 5, len: 2 }));
    assert_eq!(buffer.as_slice(), &[1, 2]);
}

#[test]
fn set_past_capacity_is_rejected() {
    let mut buffer = GrowableBuffer::<u32>::with_capacity(4);
    let err = buffer.set(4, 1).expect_err("set must fail");
    assert_eq!(err, BufferError::IndexOutOfRange { index: 4, capacity: 4 });
    assert!(err.to_string().contains("capacity 4"), "unexpected error message: {err}");
}

#[test]
fn set_beyond_length_zero_fills_gap() {
    let mut buffer = filled(&[7]);
    buffer.set_capacity(8);
    buffer.set(3, 9).unwrap();
    assert_eq!(buffer.as_slice(), &[7, 0, 0, 9]);
}

#[test]
fn remove_range_clips_to_length() {
    let mut buffer = filled(&[1, 2, 3, 4, 5]);
    assert_eq!(buffer.remove_range(3, 10), 2);
    assert_eq!(buffer.remove_range(7, 1), 0);
    assert_eq!(buffer.as_slice(), &[1, 2, 3]);
    assert_eq!(buffer.remove_at(3), None);
}

#[test]
fn range_bytes_clip_to_length() {
    let buffer = filled(&[1, 2, 3]);
    assert_eq!(buffer.range_bytes(1..8).len(), 2 * 4);
    assert!(buffer.range_bytes(5..8).is_empty());
    assert_eq!(buffer.as_bytes().len(), 12);
}
