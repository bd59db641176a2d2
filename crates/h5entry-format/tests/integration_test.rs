use h5entry_format::attribute::AttributeMessage;
use h5entry_format::dataspace::Dataspace;
use h5entry_format::datatype::{Datatype, DatatypeByteOrder};
use h5entry_format::error::FormatError;
use h5entry_format::file_reader::read_graph;
use h5entry_format::file_writer::write_graph;
use h5entry_format::object_graph::{DatasetRecord, GroupRecord, ObjectGraph, ObjectRecord};
use h5entry_format::signature::find_signature;
use h5entry_format::superblock::Superblock;

fn f64_dataset(dims: &[u64], values: &[f64]) -> DatasetRecord {
    DatasetRecord {
        datatype: Datatype::float(8, DatatypeByteOrder::LittleEndian),
        dataspace: Dataspace::from_extents(dims).unwrap(),
        data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        attributes: Vec::new(),
    }
}

/// root -> {"temperature": dataset, "run": group -> {"counts": dataset}}
fn sample_graph() -> ObjectGraph {
    let mut graph = ObjectGraph::empty();
    graph.objects.insert(
        1,
        ObjectRecord::Dataset(f64_dataset(&[2, 2], &[1.0, 2.0, 3.0, 4.0])),
    );
    let counts = DatasetRecord {
        datatype: Datatype::integer(4, true, DatatypeByteOrder::BigEndian),
        dataspace: Dataspace::from_extents(&[3]).unwrap(),
        data: [7i32, -1, 12].iter().flat_map(|v| v.to_be_bytes()).collect(),
        attributes: Vec::new(),
    };
    graph.objects.insert(3, ObjectRecord::Dataset(counts));
    graph.objects.insert(
        2,
        ObjectRecord::Group(GroupRecord {
            links: vec![("counts".into(), 3)],
            attributes: vec![AttributeMessage {
                name: "operator".into(),
                datatype: Datatype::integer(1, false, DatatypeByteOrder::LittleEndian),
                dataspace: Dataspace::from_extents(&[2]).unwrap(),
                raw_data: vec![b'o', b'k'],
            }],
        }),
    );
    if let Some(ObjectRecord::Group(root)) = graph.objects.get_mut(&0) {
        root.links.push(("temperature".into(), 1));
        root.links.push(("run".into(), 2));
    }
    graph
}

#[test]
fn write_then_read_preserves_structure() {
    let graph = sample_graph();
    let bytes = write_graph(&graph).expect("write");
    assert_eq!(find_signature(&bytes), Ok(0));
    let back = read_graph(&bytes).expect("read");

    assert_eq!(back.objects.len(), 4);
    for path in ["/temperature", "/run", "/run/counts"] {
        let src = graph.get(graph.resolve(path).unwrap()).unwrap();
        let dst = back.get(back.resolve(path).unwrap()).unwrap();
        match (src, dst) {
            (ObjectRecord::Group(a), ObjectRecord::Group(b)) => {
                assert_eq!(a.attributes, b.attributes);
                assert_eq!(a.links.len(), b.links.len());
            }
            (a, b) => assert_eq!(a, b, "{path}"),
        }
    }
}

#[test]
fn rewrite_is_stable() {
    let first = write_graph(&sample_graph()).unwrap();
    let second = write_graph(&read_graph(&first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn shared_object_written_once() {
    let mut graph = sample_graph();
    if let Some(ObjectRecord::Group(root)) = graph.objects.get_mut(&0) {
        root.links.push(("alias".into(), 1));
    }
    let back = read_graph(&write_graph(&graph).unwrap()).unwrap();
    assert_eq!(back.objects.len(), 4);
    assert_eq!(back.resolve("/alias"), back.resolve("/temperature"));
}

#[test]
fn cycles_terminate() {
    let mut graph = sample_graph();
    if let Some(ObjectRecord::Group(run)) = graph.objects.get_mut(&2) {
        run.links.push(("up".into(), 0));
    }
    let back = read_graph(&write_graph(&graph).unwrap()).unwrap();
    assert_eq!(back.resolve("/run/up"), Some(back.root));
}

#[test]
fn user_block_is_honoured() {
    let bytes = write_graph(&sample_graph()).unwrap();
    let mut sb = Superblock::parse(&bytes, 0).unwrap();
    sb.base_address = 512;
    let mut shifted = vec![0u8; 512];
    shifted.extend_from_slice(&sb.serialize());
    shifted.extend_from_slice(&bytes[sb.serialize().len()..]);

    assert_eq!(find_signature(&shifted), Ok(512));
    let back = read_graph(&shifted).unwrap();
    assert_eq!(back.objects.len(), 4);
}

#[test]
fn corrupted_header_detected() {
    let mut bytes = write_graph(&sample_graph()).unwrap();
    let root = Superblock::parse(&bytes, 0).unwrap().root_group_address as usize;
    bytes[root + 8] ^= 0x40;
    assert!(matches!(
        read_graph(&bytes),
        Err(FormatError::ChecksumMismatch { .. })
    ));
}

#[test]
fn truncated_file_detected() {
    let bytes = write_graph(&sample_graph()).unwrap();
    assert!(read_graph(&bytes[..bytes.len() - 4]).is_err());
}
