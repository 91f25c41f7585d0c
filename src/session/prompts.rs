pub const WELCOME: &str = "Welcome to Emails2Telegram bot!
It allows you to receive emails from your mailbox right into this Telegram chat.

To add a mailbox you want to receive messages from send /new

To stop receive messages from current active mailbox send /stop";

pub const ENTER_EMAIL: &str = "Enter your email";

pub const ENTER_PASSWORD: &str = "Enter your APPLICATION password
(google how to generate application password for your mailbox)";

pub const DONE: &str = "Done!";

pub const DISCONNECTED: &str = "Your mailbox is disconnected from the chatbot now.

To connect the chatbot to your mailbox again send /new";

pub const INVALID_CREDENTIALS: &str = "You entered invalid credentials

Make sure that you entered application password and not human one, \
google how to generate application password for your mailbox.

Try send /new and enter valid credentials again";
