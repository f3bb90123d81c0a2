mod common;

use std::fmt;

use common::{STAMP, bootloader, content, mount};
use extent_fs::{
    DiskInode, Error, ImageBuilder, OpenFileTable, OpenFlag, ROOT_INODE_ID, Session,
};

/// /
/// ├── a/
/// │   ├── b/
/// │   │   └── deep.txt
/// │   └── note
/// └── top.txt
fn tree(boot: &[u8]) -> Session {
    let mut builder = ImageBuilder::new(boot).datetime(STAMP);
    let a = builder.mkdir(ROOT_INODE_ID, "a").unwrap();
    let b = builder.mkdir(a, "b").unwrap();
    builder.add_file(b, "deep.txt", b"deep data").unwrap();
    builder.add_file(a, "note", b"note").unwrap();
    builder.add_file(ROOT_INODE_ID, "top.txt", b"top level").unwrap();
    mount(&builder).1
}

#[test]
fn dot_components_are_transparent() {
    let boot = bootloader();
    let session = tree(&boot);

    let plain = session.inode_by_path("/a/b/deep.txt").unwrap();
    assert_eq!(session.inode_by_path("/a/./b/deep.txt").unwrap(), plain);
    assert_eq!(session.inode_by_path("/./a/b/./deep.txt").unwrap(), plain);
    assert_eq!(session.inode_by_path("//a///b/deep.txt").unwrap(), plain);
    assert_eq!(session.inode_by_path("/a/b/../b/deep.txt").unwrap(), plain);
    assert_eq!(plain.size_bytes, 9);
}

#[test]
fn dot_dot_stops_at_root() {
    let boot = bootloader();
    let mut session = tree(&boot);

    let top = session.inode_by_path("/top.txt").unwrap();
    assert_eq!(session.inode_by_path("/../../top.txt").unwrap(), top);
    assert_eq!(session.inode_by_path("/a/b/../../top.txt").unwrap(), top);

    session.change_dir("/a/b").unwrap();
    assert_eq!(session.inode_by_path("../../../../top.txt").unwrap(), top);

    session.change_dir("../../..").unwrap();
    assert_eq!(session.current_path(), "/");
    assert_eq!(session.current_dir().id, ROOT_INODE_ID);
}

#[test]
fn path_resolution_errors() {
    let boot = bootloader();
    let session = tree(&boot);

    assert_eq!(session.inode_by_path("/a"), Err(Error::IsADirectory));
    assert_eq!(session.inode_by_path("/a/b/"), Err(Error::IsADirectory));
    assert_eq!(session.inode_by_path("/"), Err(Error::IsADirectory));
    assert_eq!(session.inode_by_path("/missing"), Err(Error::NotFound));
    assert_eq!(session.inode_by_path("/a/nope/deep.txt"), Err(Error::NotFound));
    assert_eq!(session.inode_by_path("/top.txt/x"), Err(Error::NotADirectory));
    assert_eq!(session.inode_by_path(""), Err(Error::InvalidPath));
}

#[test]
fn change_dir_tracks_canonical_path() {
    let boot = bootloader();
    let mut session = tree(&boot);
    assert_eq!(session.current_path(), "/");

    session.change_dir("a").unwrap();
    assert_eq!(session.current_path(), "/a");
    assert_eq!(session.inode_by_path("note").unwrap().size_bytes, 4);

    session.change_dir("./b/").unwrap();
    assert_eq!(session.current_path(), "/a/b");
    assert_eq!(session.inode_by_path("deep.txt").unwrap().size_bytes, 9);

    session.change_dir("..").unwrap();
    assert_eq!(session.current_path(), "/a");

    session.change_dir("/a/b").unwrap();
    assert_eq!(session.current_path(), "/a/b");
    session.change_dir("/").unwrap();
    assert_eq!(session.current_path(), "/");
}

#[test]
fn failed_change_dir_keeps_state() {
    let boot = bootloader();
    let mut session = tree(&boot);
    session.change_dir("/a").unwrap();
    let before = *session.current_dir();

    assert_eq!(session.change_dir("note"), Err(Error::NotADirectory));
    assert_eq!(session.change_dir("/nowhere"), Err(Error::NotFound));
    assert_eq!(session.change_dir(""), Err(Error::InvalidPath));

    assert_eq!(session.current_path(), "/a");
    assert_eq!(*session.current_dir(), before);
    // `..`仍然指向根目录
    session.change_dir("..").unwrap();
    assert_eq!(session.current_dir().id, ROOT_INODE_ID);
}

#[test]
fn listing_the_current_directory() {
    let boot = bootloader();
    let mut session = tree(&boot);

    let mut out = String::new();
    session.print_dir(&mut out).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        [
            "d 14/10/2026      256 .",
            "d 14/10/2026      256 ..",
            "d 14/10/2026      256 a",
            "f 14/10/2026        9 top.txt",
        ]
    );

    session.change_dir("a").unwrap();
    let listing = session.list_dir().unwrap();
    let names: Vec<&str> = listing
        .iter()
        .map(|(dirent, _)| dirent.name().unwrap())
        .collect();
    assert_eq!(names, [".", "..", "b", "note"]);
    assert_eq!(listing[1].1.id, ROOT_INODE_ID);
    assert!(listing[2].1.is_dir());
    assert!(listing[3].1.is_file());
}

#[test]
fn open_read_seek_close() {
    let boot = bootloader();
    let mut session = tree(&boot);

    let fd = session.open("/a/b/deep.txt", OpenFlag::Read.into()).unwrap();
    assert_eq!(fd, 0);

    let mut buf = [0; 4];
    assert_eq!(session.read(fd, &mut buf), Ok(4));
    assert_eq!(&buf, b"deep");
    assert_eq!(session.seek(fd, 5), Ok(5));
    let mut rest = [0; 16];
    assert_eq!(session.read(fd, &mut rest), Ok(4));
    assert_eq!(&rest[..4], b"data");
    assert_eq!(session.read(fd, &mut rest), Ok(0));

    let other = session.open("top.txt", OpenFlag::Read.into()).unwrap();
    assert_eq!(other, 1);
    assert_eq!(session.files().len(), 2);

    session.close(fd).unwrap();
    assert_eq!(session.close(fd), Err(Error::BadDescriptor));
    assert_eq!(session.read(fd, &mut buf), Err(Error::BadDescriptor));
    assert_eq!(session.open("/a/note", OpenFlag::Read.into()), Ok(0));
    assert_eq!(session.stat(0).unwrap().size_bytes, 4);
    assert_eq!(session.stat(1), Ok(session.inode_by_path("/top.txt").unwrap()));
    assert_eq!(session.stat(2), Err(Error::BadDescriptor));
}

#[test]
fn open_rejections() {
    let boot = bootloader();
    let mut session = tree(&boot);

    assert_eq!(
        session.open("/top.txt", OpenFlag::Read | OpenFlag::Write),
        Err(Error::ReadOnly)
    );
    assert_eq!(session.open("/a", OpenFlag::Read.into()), Err(Error::IsADirectory));
    assert_eq!(session.open("/none", OpenFlag::Read.into()), Err(Error::NotFound));

    for fd in 0..OpenFileTable::CAPACITY {
        assert_eq!(session.open("/top.txt", OpenFlag::Read.into()), Ok(fd));
    }
    assert_eq!(
        session.open("/top.txt", OpenFlag::Read.into()),
        Err(Error::TooManyOpenFiles)
    );
}

#[test]
fn sessions_are_independent() {
    let boot = bootloader();
    let big = content(10_000, 5);
    let mut builder = ImageBuilder::new(&boot);
    let dir = builder.mkdir(ROOT_INODE_ID, "dir").unwrap();
    builder.add_file(dir, "big", &big).unwrap();
    let (_disk, mut first) = mount(&builder);
    let second = Session::new(first.fs().clone()).unwrap();

    first.change_dir("dir").unwrap();
    assert_eq!(first.current_path(), "/dir");
    assert_eq!(second.current_path(), "/");
    assert_eq!(second.inode_by_path("big"), Err(Error::NotFound));

    let fd = first.open("big", OpenFlag::Read.into()).unwrap();
    let mut data = vec![0; 20_000];
    assert_eq!(first.read(fd, &mut data), Ok(10_000));
    assert_eq!(&data[..10_000], &big[..]);
    assert!(second.files().is_empty());
}

#[test]
fn device_errors_propagate() {
    let boot = bootloader();
    let mut builder = ImageBuilder::new(&boot);
    let a = builder.mkdir(ROOT_INODE_ID, "a").unwrap();
    builder.add_file(a, "f", b"payload").unwrap();
    let (disk, session) = mount(&builder);
    let inode = session.inode_by_path("/a/f").unwrap();

    disk.break_reads();
    assert!(matches!(session.inode_by_path("/a/f"), Err(Error::Device(_))));
    assert!(matches!(session.inode_by_path("a/f"), Err(Error::Device(_))));
    assert!(matches!(session.fs().read_file(&inode), Err(Error::Device(_))));
    assert!(matches!(session.list_dir(), Err(Error::Device(_))));

    let mut out = String::new();
    assert!(matches!(session.print_dir(&mut out), Err(Error::Device(_))));
    assert!(out.is_empty());
}

#[test]
fn listing_stops_at_missing_inode() {
    let boot = bootloader();
    let mut builder = ImageBuilder::new(&boot).datetime(STAMP);
    builder.add_path("one", b"1").unwrap();
    builder.add_path("two", b"22").unwrap();
    let (disk, session) = mount(&builder);

    // 清空 2 号槽位，目录项仍然引用它
    let first_inode_block = session.fs().super_block().first_inode_block as usize;
    disk.patch_block(first_inode_block, |block| {
        block[2 * DiskInode::SIZE..3 * DiskInode::SIZE].fill(0);
    });

    let mut out = String::new();
    assert_eq!(session.print_dir(&mut out), Ok(()));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        [
            "d 14/10/2026      256 .",
            "d 14/10/2026      256 ..",
            "one: inode 2 missing",
        ]
    );
    assert_eq!(session.list_dir().unwrap_err(), Error::NotFound);
}

#[test]
fn extents_shorter_than_size_are_corrupted() {
    let boot = bootloader();
    let data = content(5000, 7);
    let mut builder = ImageBuilder::new(&boot);
    builder.add_path("one", &data).unwrap();
    let (disk, session) = mount(&builder);

    let mut inode = session.inode_by_path("/one").unwrap();
    assert_eq!(inode.extents[0].length, 2);
    inode.extents[0].length = 1;

    let first_inode_block = session.fs().super_block().first_inode_block as usize;
    disk.patch_block(first_inode_block, |block| {
        inode.encode(&mut block[2 * DiskInode::SIZE..]).unwrap();
    });

    let stored = session.inode_by_path("/one").unwrap();
    assert_eq!(stored.extents[0].length, 1);
    let mut dest = vec![0; 2 * extent_fs::BLOCK_SIZE];
    assert_eq!(session.fs().load_file(&stored, &mut dest), Err(Error::Corrupted));
    assert_eq!(session.fs().read_file(&stored), Err(Error::Corrupted));
}

/// 写满`room`个字节后拒绝继续写入
struct Limited {
    room: usize,
}

impl fmt::Write for Limited {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.room = self.room.checked_sub(s.len()).ok_or(fmt::Error)?;
        Ok(())
    }
}

#[test]
fn rejected_output_is_reported() {
    let boot = bootloader();
    let session = tree(&boot);

    assert_eq!(session.print_dir(&mut Limited { room: 30 }), Err(Error::Output));
    assert_eq!(session.print_dir(&mut Limited { room: 4096 }), Ok(()));
}
