use approx::assert_relative_eq;
use glam::Vec3;
use probesh_core::BoxRoom;
use probesh_io::{Error, PomFileReader, PomFileWriter, FORMAT_VERSION, POM_MAGIC};
use tempfile::tempdir;

fn write_room(path: &std::path::Path, face_size: u32, open_ceiling: bool) {
    let room = BoxRoom::default().with_open_ceiling(open_ceiling);
    let batch = room.capture(room.center(), face_size);
    let mut writer = PomFileWriter::create(path).unwrap();
    writer.write_batch(&batch).unwrap();
}

#[test]
fn test_header_and_samples_survive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("room.pom");
    let room = BoxRoom::default().with_open_ceiling(true);
    let original = room.capture(room.center(), 8);
    PomFileWriter::create(&path)
        .unwrap()
        .write_batch(&original)
        .unwrap();

    let reader = PomFileReader::open(&path).unwrap();
    let header = reader.header();
    assert_eq!(header.face_size, 8);
    assert_eq!(header.sample_count(), 6 * 8 * 8);
    assert_eq!(reader.file_size(), 28 + 6 * 8 * 8 * 52);
    assert_relative_eq!(header.position.y, room.center().y);

    let batch = reader.read_batch().unwrap();
    assert_eq!(batch.len(), original.len());
    assert!(batch.is_complete());
    assert_eq!(batch.position, original.position);
    assert_eq!(batch.albedo, original.albedo);
    assert_eq!(batch.direction, original.direction);
    let sky = (0..batch.len()).filter(|&i| batch.is_sky(i)).count();
    let original_sky = (0..original.len()).filter(|&i| original.is_sky(i)).count();
    assert_eq!(sky, original_sky);
    assert!(sky > 0);
    assert!(batch.set_id.iter().all(|&id| id == -1));
}

#[test]
fn test_truncated_capture_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("room.pom");
    write_room(&path, 4, false);

    let mut bytes = std::fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 10);
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        PomFileReader::open(&path),
        Err(Error::InvalidFormat(_))
    ));
}

#[test]
fn test_bad_magic_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("room.pom");
    write_room(&path, 2, false);

    let mut bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], &POM_MAGIC.to_le_bytes());
    bytes[0] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        PomFileReader::open(&path),
        Err(Error::InvalidFormat(_))
    ));
}

#[test]
fn test_short_file_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.pom");
    std::fs::write(&path, POM_MAGIC.to_le_bytes()).unwrap();
    assert!(PomFileReader::open(&path).is_err());
}

#[test]
fn test_oversized_face_size_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("huge.pom");
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&POM_MAGIC.to_le_bytes());
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&0xF000_0000u32.to_le_bytes());
    for _ in 0..4 {
        bytes.extend_from_slice(&0.0f32.to_le_bytes());
    }
    assert_eq!(bytes.len(), 28);
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        PomFileReader::open(&path),
        Err(Error::InvalidFormat(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        PomFileReader::open(dir.path().join("missing.pom")),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_probe_position_preserved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("offset.pom");
    let room = BoxRoom::default();
    let probe = Vec3::new(1.0, 0.5, -2.0);
    let batch = room.capture(probe, 2);
    PomFileWriter::create(&path)
        .unwrap()
        .write_batch(&batch)
        .unwrap();
    let read = PomFileReader::open(&path).unwrap().read_batch().unwrap();
    assert_eq!(read.probe_position, probe);
    assert_eq!(read.distance, batch.distance);
}
