use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use yamal::consts::{HDR_SIZE, NODE_OFF_SIZE, PAGE_SIZE};
use yamal::{Sublist, Yamal, YamalBuilder, YamalConfig, YamalError, LIST_DATA};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("yamaltest-ro-{prefix}-{pid}-{t}-{id}.ytp"))
}

fn cfg() -> YamalConfig {
    YamalBuilder::from_default().aux_thread(false).build()
}

#[test]
fn ro_reader_follows_live_writer() -> Result<()> {
    let path = unique_root("follow");
    let w = Yamal::open_with_config(&path, cfg())?;
    let r = Yamal::open_ro_with_config(&path, cfg())?;
    assert!(r.readonly());

    const N: u64 = 10_000;
    let done = AtomicBool::new(false);

    let seen = thread::scope(|s| -> Result<u64> {
        let writer = s.spawn(|| -> Result<()> {
            for i in 0..N {
                let mut res = w.reserve(8)?;
                res.data_mut().copy_from_slice(&i.to_le_bytes());
                w.commit(res, LIST_DATA)?;
            }
            done.store(true, Ordering::Release);
            Ok(())
        });

        // Читатель опрашивает хвост; ничего не пишет
        let mut msgs = r.messages(LIST_DATA)?;
        let mut expect = 0u64;
        loop {
            match msgs.next() {
                Some(m) => {
                    let m = m?;
                    let mut b = [0u8; 8];
                    b.copy_from_slice(m.data);
                    assert_eq!(u64::from_le_bytes(b), expect);
                    assert_eq!(m.seqno, expect + 1);
                    expect += 1;
                }
                None if done.load(Ordering::Acquire) && expect == N => break,
                None => thread::sleep(Duration::from_micros(50)),
            }
        }

        writer.join().expect("writer panicked")?;
        Ok(expect)
    })?;

    assert_eq!(seen, N);
    assert_eq!(r.reserved_size()?, w.reserved_size()?);

    drop(r);
    drop(w);
    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn ro_handle_cannot_mutate() -> Result<()> {
    let path = unique_root("nomut");
    {
        let w = Yamal::open_with_config(&path, cfg().with_closable(true))?;
        let mut r = w.reserve(4)?;
        r.data_mut().copy_from_slice(b"abcd");
        w.commit(r, LIST_DATA)?;
    }

    let before = fs::read(&path)?;
    let ro = Yamal::open_ro_with_config(&path, cfg())?;
    let reserved = ro.reserved_size()?;

    assert!(matches!(ro.reserve(8), Err(YamalError::ReadOnly(_))));
    assert!(matches!(ro.close(LIST_DATA), Err(YamalError::ReadOnly(_))));
    assert!(matches!(
        ro.sublist_finalize(Sublist::new(), LIST_DATA),
        Err(YamalError::ReadOnly(_))
    ));
    assert_eq!(ro.sync()?, 0);
    assert!(!ro.has_aux_thread(), "readers never start a background thread");

    // Чтение работает
    let m = ro.read(ro.begin(LIST_DATA)?)?;
    assert_eq!(m.data, b"abcd");
    assert_eq!(ro.tell(ro.next(ro.begin(LIST_DATA)?)?)?, ro.end(LIST_DATA)?.position() - 8);

    assert_eq!(ro.reserved_size()?, reserved);
    drop(ro);
    assert_eq!(fs::read(&path)?, before, "reader must not touch the file");

    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn ro_handle_rejects_reservations_made_by_writer() -> Result<()> {
    let path = unique_root("foreign-res");
    let w = Yamal::open_with_config(&path, cfg())?;
    let ro = Yamal::open_ro_with_config(&path, cfg())?;

    // Резервация писателя, отданная читателю: ReadOnly, список не меняется
    let mut r = w.reserve(4)?;
    r.data_mut().copy_from_slice(b"nope");
    assert!(matches!(ro.commit(r, LIST_DATA), Err(YamalError::ReadOnly(_))));

    let mut sub = Sublist::new();
    let r = w.reserve(4)?;
    assert!(matches!(
        ro.sublist_commit(&mut sub, r),
        Err(YamalError::ReadOnly(_))
    ));
    assert!(sub.is_empty());

    // Непустой sublist писателя тоже не финализируется через читателя
    let r = w.reserve(4)?;
    w.sublist_commit(&mut sub, r)?;
    assert!(matches!(
        ro.sublist_finalize(sub, LIST_DATA),
        Err(YamalError::ReadOnly(_))
    ));

    assert!(ro.term(ro.begin(LIST_DATA)?)?);
    assert!(w.term(w.begin(LIST_DATA)?)?);

    drop(ro);
    drop(w);
    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn ro_read_of_corrupted_size_is_an_error() -> Result<()> {
    let path = unique_root("bad-size");
    {
        let w = Yamal::open_with_config(&path, cfg())?;
        let mut r = w.reserve(8)?;
        r.data_mut().copy_from_slice(b"payload!");
        w.commit(r, LIST_DATA)?;
    }

    // Портим поле size первого узла: u64::MAX
    let size_at = (HDR_SIZE + NODE_OFF_SIZE) as usize;
    let mut bytes = fs::read(&path)?;
    bytes[size_at..size_at + 8].copy_from_slice(&u64::MAX.to_le_bytes());
    fs::write(&path, &bytes)?;

    let ro = Yamal::open_ro_with_config(&path, cfg())?;
    let it = ro.begin(LIST_DATA)?;
    assert!(!ro.term(it)?);
    assert!(matches!(ro.read(it), Err(YamalError::InvalidArgument(_))));

    drop(ro);
    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn ro_open_of_short_file_is_unexpected_eof() -> Result<()> {
    let path = unique_root("short");
    fs::write(&path, b"YAMAL001")?;

    match Yamal::open_ro_with_config(&path, cfg()) {
        Err(YamalError::UnexpectedEof { page, file_len }) => {
            assert_eq!(page, 0);
            assert_eq!(file_len, 8);
            assert!(file_len < PAGE_SIZE);
        }
        Err(e) => panic!("expected UnexpectedEof, got {e}"),
        Ok(_) => panic!("short file must not open read-only"),
    }
    // И длина файла не изменилась
    assert_eq!(fs::metadata(&path)?.len(), 8);

    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn ro_open_of_foreign_file_is_invalid_format() -> Result<()> {
    let path = unique_root("foreign");
    let mut junk = vec![0u8; PAGE_SIZE as usize];
    junk[..8].copy_from_slice(b"NOTYAMAL");
    fs::write(&path, &junk)?;

    assert!(matches!(
        Yamal::open_ro_with_config(&path, cfg()),
        Err(YamalError::InvalidFormat(_))
    ));

    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn ro_open_of_missing_file_is_io_error() -> Result<()> {
    let path = unique_root("missing");
    match Yamal::open_ro_with_config(&path, cfg()) {
        Err(YamalError::Io { source, .. }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
        }
        Err(e) => panic!("expected Io, got {e}"),
        Ok(_) => panic!("missing file must not open"),
    }
    assert!(!path.exists(), "read-only open must not create the file");
    Ok(())
}
