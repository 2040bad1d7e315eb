use crate::auth::{AuthContext, login};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 登录表单
///
/// 登录成功后认证状态变化，由路由器把用户从登录页带走。
#[component]
pub fn LoginPage(auth: AuthContext) -> impl IntoView {
    let (email, set_email) = signal(auth.state.with_untracked(|s| s.last_email.clone()));
    let (password, set_password) = signal(String::new());
    let (error_msg, set_error_msg) = signal(Option::<String>::None);
    let is_submitting = move || auth.state.with(|s| s.is_loading);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        if email.get().trim().is_empty() || password.get().is_empty() {
            set_error_msg.set(Some("Please fill in all fields".to_string()));
            return;
        }

        set_error_msg.set(None);
        spawn_local(async move {
            if let Err(e) = login(&auth, email.get_untracked(), password.get_untracked()).await {
                log_warn!("[Auth] Sign-in failed: {}", e);
                set_error_msg.set(Some(e.message().to_string()));
                set_password.set(String::new());
            }
        });
    };

    view! {
        <div class="card shrink-0 w-full max-w-md mx-auto shadow-2xl bg-base-100">
            <form class="card-body" on:submit=on_submit>
                <Show when=move || error_msg.get().is_some()>
                    <div role="alert" class="alert alert-error text-sm py-2">
                        <span>{move || error_msg.get().unwrap_or_default()}</span>
                    </div>
                </Show>

                <div class="form-control">
                    <label class="label" for="login-email">
                        <span class="label-text">"E-mail"</span>
                    </label>
                    <input
                        id="login-email"
                        type="email"
                        autocomplete="username"
                        placeholder="planner@example.com"
                        on:input=move |ev| set_email.set(event_target_value(&ev))
                        prop:value=email
                        class="input input-bordered"
                        required
                    />
                </div>
                <div class="form-control">
                    <label class="label" for="login-password">
                        <span class="label-text">"Password"</span>
                    </label>
                    <input
                        id="login-password"
                        type="password"
                        autocomplete="current-password"
                        placeholder="••••••••"
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                        prop:value=password
                        class="input input-bordered"
                        required
                    />
                </div>
                <div class="form-control mt-6">
                    <button class="btn btn-primary" disabled=is_submitting>
                        {move || if is_submitting() {
                            view! { <span class="loading loading-spinner"></span> "Signing in..." }.into_any()
                        } else {
                            "Sign in".into_any()
                        }}
                    </button>
                </div>
            </form>
        </div>
    }
}
