use crate::{partition_key, MemoryLog, PartitionReader, StreamOptions};
use std::collections::HashSet;
use std::time::Duration;

fn options(partitions: u32, instance_index: u32, instance_count: u32) -> StreamOptions {
    StreamOptions {
        topic: "error-events".into(),
        partitions,
        group: "errors-rule-engine".into(),
        consumer: "engine".into(),
        block: Duration::from_millis(10),
        batch_size: 4,
        instance_index,
        instance_count,
    }
}

#[test]
fn partition_keys() {
    assert_eq!(partition_key("error-events", 0), "error-events:0");
    assert_eq!(partition_key("resource-usage-events", 3), "resource-usage-events:3");
}

#[test]
fn single_instance_owns_every_partition() {
    assert_eq!(options(4, 0, 1).owned_partitions(), vec![0, 1, 2, 3]);
}

#[test]
fn instances_split_partitions_without_overlap() {
    let assigned: Vec<Vec<u32>> = (0..3).map(|i| options(8, i, 3).owned_partitions()).collect();
    assert_eq!(assigned[0], vec![0, 3, 6]);
    assert_eq!(assigned[1], vec![1, 4, 7]);
    assert_eq!(assigned[2], vec![2, 5]);

    let all: HashSet<u32> = assigned.iter().flatten().copied().collect();
    assert_eq!(all.len(), 8);
    assert_eq!(assigned.iter().map(Vec::len).sum::<usize>(), 8);
}

#[tokio::test]
async fn delivers_in_order_and_commits() {
    let log = MemoryLog::new(1);
    log.append(0, "a");
    log.append(0, "b");
    let mut reader = log.reader(0);

    let first = reader.poll().await.unwrap().unwrap();
    let second = reader.poll().await.unwrap().unwrap();
    assert_eq!((first.payload.as_str(), second.payload.as_str()), ("a", "b"));
    assert_eq!(first.partition, 0);

    reader.commit(&first).await.unwrap();
    reader.commit(&second).await.unwrap();
    assert_eq!(log.committed(0), vec!["0", "1"]);
    assert_eq!(log.pending(0), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_poll_times_out() {
    let log = MemoryLog::new(1).with_block(Duration::from_millis(100));
    let mut reader = log.reader(0);
    assert!(reader.poll().await.unwrap().is_none());
}

#[tokio::test]
async fn rewind_redelivers_uncommitted_in_order() {
    let log = MemoryLog::new(1);
    for payload in ["a", "b", "c"] {
        log.append(0, payload);
    }
    let mut reader = log.reader(0);

    let a = reader.poll().await.unwrap().unwrap();
    reader.commit(&a).await.unwrap();
    let b = reader.poll().await.unwrap().unwrap();
    let _c = reader.poll().await.unwrap().unwrap();

    reader.rewind();
    let again: Vec<String> = [
        reader.poll().await.unwrap().unwrap(),
        reader.poll().await.unwrap().unwrap(),
    ]
    .into_iter()
    .map(|m| m.payload)
    .collect();
    assert_eq!(again, vec!["b", "c"]);
    assert_eq!(log.deliveries(0, &b.id), 2);
    assert_eq!(log.deliveries(0, &a.id), 1);
}

#[tokio::test]
async fn partitions_are_independent() {
    let log = MemoryLog::new(2);
    log.append(0, "p0");
    log.append(1, "p1");
    let mut readers = log.readers();
    assert_eq!(readers.len(), 2);

    let m1 = readers[1].poll().await.unwrap().unwrap();
    assert_eq!(m1.payload, "p1");
    readers[1].commit(&m1).await.unwrap();
    assert_eq!(log.pending(0), 1);
    assert_eq!(log.pending(1), 0);
}

#[tokio::test]
async fn commit_of_undelivered_message_fails() {
    let log = MemoryLog::new(1);
    log.append(0, "a");
    let mut reader = log.reader(0);
    let bogus = crate::LogMessage {
        partition: 0,
        id: "0".into(),
        payload: "a".into(),
    };
    assert!(reader.commit(&bogus).await.is_err());
}

#[tokio::test]
async fn poll_wakes_on_append() {
    let log = MemoryLog::new(1).with_block(Duration::from_secs(5));
    let mut reader = log.reader(0);
    let writer = log.clone();
    let handle = tokio::spawn(async move { reader.poll().await.unwrap() });
    tokio::time::sleep(Duration::from_millis(20)).await;
    writer.append(0, "late");
    let message = handle.await.unwrap().unwrap();
    assert_eq!(message.payload, "late");
}
