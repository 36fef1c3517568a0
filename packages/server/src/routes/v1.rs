use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::{contest, participant, registration, team};
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/contests", contest_routes())
        .nest("/registrations", registration_routes())
        .nest("/participants", participant_routes())
        .nest("/teams", team_routes())
}

fn contest_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(contest::list_contests, contest::create_contest))
        .routes(routes!(
            contest::get_contest,
            contest::update_contest,
            contest::delete_contest
        ))
        .routes(routes!(contest::set_contest_status))
        .routes(routes!(
            registration::register_self,
            registration::withdraw_self
        ))
        .routes(routes!(registration::list_registrations))
        .routes(routes!(registration::audit_occupancy))
}

fn registration_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(registration::register_participant))
        .routes(routes!(registration::withdraw_participant))
}

fn participant_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(participant::me))
        .routes(routes!(participant::participant_registrations))
}

fn team_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(team::list_teams, team::create_team))
        .routes(routes!(team::get_team))
        .routes(routes!(team::join_team, team::leave_team))
        .routes(routes!(team::remove_member))
}
