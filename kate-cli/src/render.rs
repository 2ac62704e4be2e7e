//! Plain-text output for the terminal.

use kate_core::dashboard::DashboardHome;
use kate_core::route::{KateRoutes, transform_path};
use kate_core::trace::TraceDetail;
use kate_store::TraceState;

pub fn home(home: &DashboardHome) {
    println!("APIs            {}", home.total_api_count);
    println!("Requests        {}", home.request_volume);
    println!("Avg latency     {} ms", home.average_latency_ms);
    println!("Error rate      {:.2}%", home.error_rate_percent);
    println!("Last 24h        {:+.2}%", home.last24_hour_increase_percent);

    if !home.last_7_hours_flow.is_empty() {
        println!();
        println!("Flow");
        for bar in &home.last_7_hours_flow {
            println!("  {:<8} {}", bar.title, bar.value);
        }
    }

    if !home.recent_requests_with_issue.is_empty() {
        println!();
        println!("Recent issues");
        for issue in &home.recent_requests_with_issue {
            println!(
                "  {}  {}  {:<30} {}  {}",
                issue.time.format("%Y-%m-%d %H:%M:%S"),
                issue.response_status,
                issue.path,
                issue.upstream.as_deref().unwrap_or("-"),
                issue.uuid,
            );
        }
    }
}

pub fn routes(rows: &[KateRoutes]) {
    if rows.is_empty() {
        println!("No routes.");
        return;
    }
    println!("{:<7} {:<40} {:<6} {:<10} NAME", "METHOD", "PATH", "AUTH", "BODY");
    for row in rows {
        let (auth, body) = match &row.route {
            Some(route) => (
                route.authentication_policy.as_ref().map_or("-", |p| p.kind()),
                route.request_body_type().as_str(),
            ),
            None => ("?", "?"),
        };
        println!(
            "{:<7} {:<40} {:<6} {:<10} {}",
            row.method,
            row.path,
            auth,
            body,
            transform_path(&row.path)
        );
    }
}

pub fn traces(state: &TraceState) {
    let Some(page) = &state.paged_result else {
        println!("No traces.");
        return;
    };
    println!(
        "{:<36} {:<19} {:<7} {:<30} {:>6} {:>8} AUTH",
        "ID", "TIME", "METHOD", "ROUTE", "STATUS", "MS"
    );
    for trace in state.visible_traces() {
        println!(
            "{:<36} {:<19} {:<7} {:<30} {:>6} {:>8} {}{}",
            trace.id,
            trace.timestamp.format("%Y-%m-%d %H:%M:%S"),
            trace.method,
            trace.route,
            trace.status,
            trace.duration_ms,
            trace.auth_type.as_str(),
            if trace.auth_success { "" } else { " (failed)" },
        );
    }

    let mut footer = format!("page {} of {} ({} traces)", page.page, state.total_pages(), page.total);
    if !state.filter.is_empty() {
        footer.push_str(&format!(
            ", {} of {} shown",
            state.visible_traces().len(),
            page.items.len()
        ));
    }
    if page.has_previous {
        footer.push_str(&format!(", previous: --page {}", page.page - 1));
    }
    if page.has_next {
        footer.push_str(&format!(", next: --page {}", page.page + 1));
    }
    println!();
    println!("{footer}");
}

pub fn trace_detail(detail: &TraceDetail) {
    println!("{}", detail.id);
    println!("{}", detail.summary);
    println!();
    println!("Request body");
    println!("{}", or_dash(&detail.request_body));
    println!();
    println!("Response body");
    println!("{}", or_dash(&detail.response_body));
}

fn or_dash(body: &str) -> &str {
    if body.is_empty() { "-" } else { body }
}
