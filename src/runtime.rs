use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::clients::message_sender::MessageSender;
use crate::handlers::http;
use crate::service::booking::BookingCoordinator;
use crate::storage::reminder_queue::ReminderQueue;
use crate::tasks::reminder_loop;
use crate::tasks::task_runner::TaskRunner;

pub async fn run_api(
    coordinator: Arc<BookingCoordinator>,
    queue: Arc<ReminderQueue>,
    sender: Arc<dyn MessageSender>,
    bind_addr: SocketAddr,
    poll_interval: Duration,
) {
    let mut task_runner = TaskRunner::new();
    task_runner.add_task(
        "reminder_loop",
        reminder_loop::run_reminder_loop(queue, sender, poll_interval),
    );
    let _handles = task_runner.start_all();

    info!(%bind_addr, "scheduling API listening");
    warp::serve(http::routes(coordinator)).run(bind_addr).await;
}
