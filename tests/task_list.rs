use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use todolist::filter::TaskQuery;
use todolist::store::{SqliteTaskStore, TaskStore};
use todolist::task::{Priority, Task};
use todolist::task_list::{seed_tasks, TaskListModel};

async fn wait_until<F>(rx: &mut watch::Receiver<Vec<Task>>, condition: F) -> Vec<Task>
where
    F: FnMut(&Vec<Task>) -> bool,
{
    timeout(Duration::from_secs(5), rx.wait_for(condition))
        .await
        .expect("timed out waiting for task list")
        .expect("task list closed")
        .clone()
}

fn ids(tasks: &[Task]) -> Vec<i64> {
    tasks.iter().map(|t| t.id).collect()
}

#[tokio::test]
async fn first_activation_seeds_three_tasks() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let model = TaskListModel::activate(store.clone()).await.unwrap();

    let stored = store.all_tasks().first().await.unwrap();
    assert_eq!(ids(&stored), [1, 2, 3]);
    assert_eq!(
        stored.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
        [
            "Goooooooooo",
            "Drink coffee",
            "Another task a lot of text to check if it works"
        ]
    );
    assert_eq!(stored, seed_tasks());

    let mut rx = model.subscribe();
    let shown = wait_until(&mut rx, |t| t.len() == 3).await;
    assert_eq!(shown, stored);
}

#[tokio::test]
async fn activation_leaves_existing_data_alone() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    store.add(Task::new("Mine", "05.05.2026")).await.unwrap();

    let _model = TaskListModel::activate(store.clone()).await.unwrap();
    drop(_model);
    let _again = TaskListModel::activate(store.clone()).await.unwrap();

    let stored = store.all_tasks().first().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Mine");
}

#[tokio::test]
async fn search_takes_precedence_over_completion() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let mut model = TaskListModel::activate(store.clone()).await.unwrap();
    let mut rx = model.subscribe();
    wait_until(&mut rx, |t| t.len() == 3).await;

    model.set_completed_filter(Some(false));
    model.set_priority_filter(Some(Priority::High));
    assert_eq!(model.query(), &TaskQuery::Pending);
    let pending = wait_until(&mut rx, |t| ids(t) == [1, 3]).await;
    assert!(pending.iter().all(|t| !t.is_completed));

    model.set_search("coffee");
    assert_eq!(model.query(), &TaskQuery::Search("coffee".into()));
    let found = wait_until(&mut rx, |t| ids(t) == [2]).await;
    let search_only = store.search_tasks("coffee").first().await.unwrap();
    assert_eq!(found, search_only);

    model.set_search("  ");
    assert_eq!(model.query(), &TaskQuery::Pending);
    wait_until(&mut rx, |t| ids(t) == [1, 3]).await;

    model.clear_filters();
    assert_eq!(model.query(), &TaskQuery::All);
    wait_until(&mut rx, |t| t.len() == 3).await;
}

#[tokio::test]
async fn overdue_flag_does_not_change_the_list() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let mut model = TaskListModel::activate(store).await.unwrap();
    let mut rx = model.subscribe();
    wait_until(&mut rx, |t| t.len() == 3).await;

    model.set_overdue(true);
    assert_eq!(model.query(), &TaskQuery::All);
    assert!(model.filters().overdue);
    assert_eq!(model.filters().active_labels(), ["Overdue"]);
}

#[tokio::test]
async fn mutations_show_up_in_the_filtered_list() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let mut model = TaskListModel::activate(store.clone()).await.unwrap();
    let mut rx = model.subscribe();
    wait_until(&mut rx, |t| t.len() == 3).await;

    model.set_completed_filter(Some(true));
    wait_until(&mut rx, |t| ids(t) == [2]).await;

    model.add_task("Read a book", "12.12.2026");
    let first = store.get_by_id(1).await.unwrap().unwrap();
    model.toggle_completed(&first);
    let shown = wait_until(&mut rx, |t| ids(t) == [1, 2]).await;
    assert!(shown.iter().all(|t| t.is_completed));

    model.settle().await;
    let added = store.pending_tasks().first().await.unwrap();
    assert!(added.iter().any(|t| t.title == "Read a book" && t.id == 4));
}

#[tokio::test]
async fn deleted_task_disappears_everywhere() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let mut model = TaskListModel::activate(store.clone()).await.unwrap();
    let mut rx = model.subscribe();
    wait_until(&mut rx, |t| t.len() == 3).await;

    let coffee = store.get_by_id(2).await.unwrap().unwrap();
    model.delete_task(coffee);
    wait_until(&mut rx, |t| ids(t) == [1, 3]).await;
    model.settle().await;

    assert_eq!(store.get_by_id(2).await.unwrap(), None);
    for query in [
        TaskQuery::All,
        TaskQuery::Completed,
        TaskQuery::Pending,
        TaskQuery::ByPriority(Priority::Low),
        TaskQuery::Search("coffee".into()),
    ] {
        let tasks = store.query(&query).await.unwrap();
        assert!(tasks.iter().all(|t| t.id != 2), "{query:?}");
    }
}

#[tokio::test]
async fn unchanged_update_does_not_republish() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let mut model = TaskListModel::activate(store.clone()).await.unwrap();
    let mut rx = model.subscribe();
    let before = wait_until(&mut rx, |t| t.len() == 3).await;
    rx.borrow_and_update();

    model.update_task(before[0].clone());
    model.settle().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!rx.has_changed().unwrap());
    assert_eq!(model.tasks(), before);
    assert_eq!(store.get_by_id(1).await.unwrap().as_ref(), before.first());
}

#[tokio::test]
async fn selection_stays_within_the_list() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let mut model = TaskListModel::activate(store).await.unwrap();
    let mut rx = model.subscribe();
    wait_until(&mut rx, |t| t.len() == 3).await;

    model.select_previous();
    assert_eq!(model.selected, 0);
    for _ in 0..5 {
        model.select_next();
    }
    assert_eq!(model.selected, 2);
    assert_eq!(model.selected_task().unwrap().id, 3);

    model.set_completed_filter(Some(true));
    assert_eq!(model.selected, 0);
    wait_until(&mut rx, |t| t.len() == 1).await;
    model.select_next();
    model.clamp_selection();
    assert_eq!(model.selected_task().unwrap().id, 2);
}

#[tokio::test]
async fn dropping_the_model_stops_publishing() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let model = TaskListModel::activate(store.clone()).await.unwrap();
    let mut rx = model.subscribe();
    wait_until(&mut rx, |t| t.len() == 3).await;
    rx.borrow_and_update();

    drop(model);
    store.add(Task::new("Late arrival", "01.01.2030")).await.unwrap();

    let closed = timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("collector still running after drop");
    assert!(closed.is_err());
    assert_eq!(rx.borrow().len(), 3);
    assert_eq!(store.all_tasks().first().await.unwrap().len(), 4);
}
