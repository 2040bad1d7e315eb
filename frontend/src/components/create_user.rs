use crate::auth::{AuthContext, create_user};
use crate::components::{Notice, NoticeBar};
use fleetdesk_shared::{DEFAULT_ROLE, ROLE_ADMIN, ROLE_PLANNER};
use leptos::prelude::*;
use leptos::task::spawn_local;

const ROLE_CHOICES: [(&str, &str); 3] = [
    (DEFAULT_ROLE, "Viewer"),
    (ROLE_PLANNER, "Planner"),
    (ROLE_ADMIN, "Administrator"),
];

/// 管理员创建用户
#[component]
pub fn CreateUserPage(auth: AuthContext) -> impl IntoView {
    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (role, set_role) = signal(DEFAULT_ROLE.to_string());
    let (is_submitting, set_is_submitting) = signal(false);
    let (notice, set_notice) = signal(Notice::None);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_submitting.set(true);
        spawn_local(async move {
            let result = create_user(
                &auth,
                email.get_untracked(),
                password.get_untracked(),
                role.get_untracked(),
            )
            .await;
            match result {
                Ok(profile) => {
                    set_notice.set(Some((
                        format!("Created {} as {}", profile.email, profile.role),
                        false,
                    )));
                    set_email.set(String::new());
                    set_password.set(String::new());
                    set_role.set(DEFAULT_ROLE.to_string());
                }
                Err(e) => {
                    log_warn!("[Auth] Creating user failed: {}", e);
                    set_notice.set(Some((format!("Creating user failed: {}", e.message()), true)));
                }
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <div class="card w-full max-w-lg shadow-xl bg-base-100">
            <form class="card-body" on:submit=on_submit>
                <NoticeBar notice=notice set_notice=set_notice />

                <div class="form-control">
                    <label class="label" for="new-user-email">
                        <span class="label-text">"E-mail"</span>
                    </label>
                    <input
                        id="new-user-email"
                        type="email"
                        on:input=move |ev| set_email.set(event_target_value(&ev))
                        prop:value=email
                        class="input input-bordered"
                        required
                    />
                </div>
                <div class="form-control">
                    <label class="label" for="new-user-password">
                        <span class="label-text">"Initial password"</span>
                    </label>
                    <input
                        id="new-user-password"
                        type="password"
                        autocomplete="new-password"
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                        prop:value=password
                        class="input input-bordered"
                        required
                    />
                </div>
                <div class="form-control">
                    <label class="label" for="new-user-role">
                        <span class="label-text">"Role"</span>
                    </label>
                    <select
                        id="new-user-role"
                        class="select select-bordered"
                        on:change=move |ev| set_role.set(event_target_value(&ev))
                        prop:value=role
                    >
                        {ROLE_CHOICES
                            .iter()
                            .map(|(value, label)| view! { <option value=*value>{*label}</option> })
                            .collect_view()}
                    </select>
                </div>
                <div class="form-control mt-6">
                    <button class="btn btn-primary" disabled=move || is_submitting.get()>
                        {move || if is_submitting.get() { "Creating..." } else { "Create user" }}
                    </button>
                </div>
            </form>
        </div>
    }
}
