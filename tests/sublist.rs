use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use yamal::{Sublist, Yamal, YamalBuilder, YamalConfig, YamalError, LIST_DATA, LIST_SUBS};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("yamaltest-sub-{prefix}-{pid}-{t}-{id}.ytp"))
}

fn cfg() -> YamalConfig {
    YamalBuilder::from_default().aux_thread(false).build()
}

#[test]
fn sublist_is_published_atomically_with_consecutive_seqnos() -> Result<()> {
    let path = unique_root("basic");
    let y = Yamal::open_with_config(&path, cfg())?;

    let mut r = y.reserve(3)?;
    r.data_mut().copy_from_slice(b"pre");
    y.commit(r, LIST_SUBS)?;

    let mut sub = Sublist::new();
    assert!(sub.is_empty());
    for i in 0..5u8 {
        let mut r = y.reserve(2)?;
        r.data_mut().copy_from_slice(&[b's', b'0' + i]);
        y.sublist_commit(&mut sub, r)?;
        // Ничего не видно до finalize
        assert_eq!(y.messages(LIST_SUBS)?.count(), 1);
    }
    assert_eq!(sub.len(), 5);
    assert!(sub.first().is_some());
    assert!(sub.last() > sub.first());

    y.sublist_finalize(sub, LIST_SUBS)?;

    let got: Vec<(u64, Vec<u8>)> = y
        .messages(LIST_SUBS)?
        .map(|m| m.map(|m| (m.seqno, m.data.to_vec())))
        .collect::<yamal::Result<_>>()?;
    assert_eq!(got.len(), 6);
    assert_eq!(got[0], (1, b"pre".to_vec()));
    for (i, (seqno, data)) in got[1..].iter().enumerate() {
        assert_eq!(*seqno, i as u64 + 2);
        assert_eq!(data, &vec![b's', b'0' + i as u8]);
    }

    drop(y);
    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn sublists_interleave_with_single_commits_without_splitting() -> Result<()> {
    let path = unique_root("interleave");
    let y = Yamal::open_with_config(&path, cfg())?;

    const BATCHES: u64 = 500;
    const BATCH: u64 = 4;
    const SINGLES: u64 = 2_000;

    thread::scope(|s| -> Result<()> {
        let batcher = s.spawn(|| -> Result<()> {
            for b in 0..BATCHES {
                let mut sub = Sublist::new();
                for k in 0..BATCH {
                    let mut r = y.reserve(9)?;
                    r.data_mut()[0] = b'B';
                    r.data_mut()[1..].copy_from_slice(&(b * BATCH + k).to_le_bytes());
                    y.sublist_commit(&mut sub, r)?;
                }
                y.sublist_finalize(sub, LIST_DATA)?;
            }
            Ok(())
        });
        let single = s.spawn(|| -> Result<()> {
            for i in 0..SINGLES {
                let mut r = y.reserve(9)?;
                r.data_mut()[0] = b'S';
                r.data_mut()[1..].copy_from_slice(&i.to_le_bytes());
                y.commit(r, LIST_DATA)?;
            }
            Ok(())
        });
        batcher.join().expect("batcher panicked")?;
        single.join().expect("single writer panicked")?;
        Ok(())
    })?;

    let msgs: Vec<(u64, u8, u64)> = y
        .messages(LIST_DATA)?
        .map(|m| {
            m.map(|m| {
                let mut b = [0u8; 8];
                b.copy_from_slice(&m.data[1..9]);
                (m.seqno, m.data[0], u64::from_le_bytes(b))
            })
        })
        .collect::<yamal::Result<_>>()?;
    assert_eq!(msgs.len() as u64, BATCHES * BATCH + SINGLES);

    let mut next_b = 0u64;
    let mut next_s = 0u64;
    let mut i = 0;
    while i < msgs.len() {
        assert_eq!(msgs[i].0, i as u64 + 1, "seqnos are dense");
        match msgs[i].1 {
            b'S' => {
                assert_eq!(msgs[i].2, next_s);
                next_s += 1;
                i += 1;
            }
            b'B' => {
                // Пакет идёт целиком, без вклинившихся одиночных сообщений
                assert_eq!(msgs[i].2 % BATCH, 0, "batch starts at its first node");
                for k in 0..BATCH as usize {
                    assert_eq!(msgs[i + k].1, b'B');
                    assert_eq!(msgs[i + k].2, next_b);
                    assert_eq!(msgs[i + k].0, (i + k) as u64 + 1);
                    next_b += 1;
                }
                i += BATCH as usize;
            }
            other => panic!("unexpected tag {other}"),
        }
    }
    assert_eq!(next_b, BATCHES * BATCH);
    assert_eq!(next_s, SINGLES);

    drop(y);
    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn empty_sublist_cannot_be_finalized() -> Result<()> {
    let path = unique_root("empty");
    let y = Yamal::open_with_config(&path, cfg())?;

    assert!(matches!(
        y.sublist_finalize(Sublist::new(), LIST_DATA),
        Err(YamalError::InvalidArgument(_))
    ));
    assert!(y.term(y.begin(LIST_DATA)?)?);

    drop(y);
    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn sublist_into_closed_list_fails() -> Result<()> {
    let path = unique_root("closed");
    let y = Yamal::open_with_config(&path, cfg().with_closable(true))?;
    y.close(LIST_DATA)?;

    let mut sub = Sublist::new();
    for _ in 0..3 {
        let r = y.reserve(4)?;
        y.sublist_commit(&mut sub, r)?;
    }
    let err = y
        .sublist_finalize(sub, LIST_DATA)
        .expect_err("closed list must reject the chain");
    assert!(err.is_closed());
    assert_eq!(y.messages(LIST_DATA)?.count(), 0);

    drop(y);
    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn nodes_only_commit_through_the_handle_that_reserved_them() -> Result<()> {
    let path_a = unique_root("owner-a");
    let path_b = unique_root("owner-b");
    let a = Yamal::open_with_config(&path_a, cfg())?;
    let b = Yamal::open_with_config(&path_b, cfg())?;

    // Смещение из файла A ничего не значит в файле B
    let mut r = a.reserve(8)?;
    r.data_mut().copy_from_slice(b"from a!!");
    assert!(matches!(b.commit(r, LIST_DATA), Err(YamalError::InvalidArgument(_))));

    let mut sub = Sublist::new();
    let r = a.reserve(4)?;
    assert!(matches!(
        b.sublist_commit(&mut sub, r),
        Err(YamalError::InvalidArgument(_))
    ));
    assert!(sub.is_empty());

    // Цепочка, собранная на A, не продолжается и не публикуется через B
    let r = a.reserve(4)?;
    a.sublist_commit(&mut sub, r)?;
    let r = b.reserve(4)?;
    assert!(matches!(
        b.sublist_commit(&mut sub, r),
        Err(YamalError::InvalidArgument(_))
    ));
    assert_eq!(sub.len(), 1);
    assert!(matches!(
        b.sublist_finalize(sub, LIST_DATA),
        Err(YamalError::InvalidArgument(_))
    ));
    assert!(b.term(b.begin(LIST_DATA)?)?);
    assert!(a.term(a.begin(LIST_DATA)?)?);

    // Второй хэндл на тот же файл тоже чужой
    let a2 = Yamal::open_with_config(&path_a, cfg())?;
    let r = a.reserve(4)?;
    assert!(matches!(a2.commit(r, LIST_DATA), Err(YamalError::InvalidArgument(_))));

    // Свой хэндл по-прежнему работает
    let mut r = a.reserve(4)?;
    r.data_mut().copy_from_slice(b"mine");
    a.commit(r, LIST_DATA)?;
    let mut sub = Sublist::new();
    for _ in 0..2 {
        let r = b.reserve(4)?;
        b.sublist_commit(&mut sub, r)?;
    }
    b.sublist_finalize(sub, LIST_DATA)?;
    assert_eq!(a2.read(a2.begin(LIST_DATA)?)?.data, b"mine");
    assert_eq!(b.messages(LIST_DATA)?.count(), 2);

    drop(a2);
    drop(a);
    drop(b);
    let _ = fs::remove_file(&path_a);
    let _ = fs::remove_file(&path_b);
    Ok(())
}
